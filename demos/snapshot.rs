//! Usage:
//! ./snapshot write image.jpg snapshot.json
//! ./snapshot test image.jpg snapshot.json

use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    process::exit,
};

use image::imageops;
use itertools::Itertools;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    pub cells_x: usize,
    pub cells_y: usize,
    /// One 31-channel descriptor per cell, row-major.
    pub descriptors: Vec<Vec<f32>>,
}

impl Snapshot {
    fn new(features: &Array3<f32>) -> Self {
        let (cells_y, cells_x, _) = features.dim();
        Snapshot {
            cells_x,
            cells_y,
            descriptors: features
                .lanes(ndarray::Axis(2))
                .into_iter()
                .map(|d| d.to_vec())
                .collect_vec(),
        }
    }
}

fn write_snapshot(features: &Array3<f32>, out_path: &Path) -> Result<(), Box<dyn Error>> {
    fs::write(out_path, serde_json::to_string(&Snapshot::new(features))?)?;
    Ok(())
}

fn test_snapshot(features: &Array3<f32>, snapshot_path: &Path) -> Result<bool, Box<dyn Error>> {
    let snap: Snapshot = serde_json::from_str(&fs::read_to_string(snapshot_path)?)?;
    let actual = Snapshot::new(features);
    if (snap.cells_x, snap.cells_y) != (actual.cells_x, actual.cells_y) {
        eprintln!(
            "Cell grid mismatch:\nExpected:\t{}x{}\nActual:\t{}x{}",
            snap.cells_x, snap.cells_y, actual.cells_x, actual.cells_y
        );
        return Ok(false);
    }
    const MAX_DIFF: f32 = 1e-5;
    let mut pass = true;
    for (i, (snap_desc, desc)) in snap.descriptors.iter().zip(&actual.descriptors).enumerate() {
        let (max_diff_idx, max_diff) = snap_desc
            .iter()
            .zip(desc)
            .map(|(a, b)| (a - b).abs())
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .expect("descriptor not empty");
        if max_diff > MAX_DIFF {
            let (x, y) = (i % actual.cells_x, i / actual.cells_x);
            eprintln!("Cell ({x}, {y}) mismatch: diff={max_diff} at channel {max_diff_idx}\nExpected: {snap_desc:?}\nActual  : {desc:?}");
            pass = false;
            break;
        }
    }
    Ok(pass)
}

fn main() {
    let args = std::env::args().collect_vec();
    if args.len() != 4 || !(args[1] == "write" || args[1] == "test") {
        eprintln!(
            r#"
Usage:
./snapshot write [IMAGE] [SNAPSHOT]
./snapshot test [IMAGE] [SNAPSHOT]
        "#
        );
        exit(1);
    }
    let what = &args[1];
    let image_path = PathBuf::from(&args[2]);
    let snapshot_path = PathBuf::from(&args[3]);

    let image = match image::open(&image_path) {
        Ok(img) => {
            let img = img.to_luma8();
            let cell = hog_features::CELL_SIZE as u32;
            let (w, h) = (img.width() / cell * cell, img.height() / cell * cell);
            imageops::crop_imm(&img, 0, 0, w, h).to_image()
        }
        Err(err) => {
            eprintln!("Error opening image '{}': {:?}", image_path.display(), err);
            exit(1);
        }
    };
    let features = match hog_features::hog(&image) {
        Ok(features) => features,
        Err(err) => {
            eprintln!("Error: {err}");
            exit(1);
        }
    };
    match what.as_str() {
        "write" => {
            if let Err(err) = write_snapshot(&features, &snapshot_path) {
                eprintln!("Error: {:?}", err);
                exit(1);
            }
        }
        "test" => match test_snapshot(&features, &snapshot_path) {
            Err(err) => {
                eprintln!("Error: {:?}", err);
                exit(1);
            }
            Ok(false) => {
                eprintln!("FAIL");
                exit(1);
            }
            Ok(true) => {
                eprintln!("PASS");
            }
        },
        _ => unreachable!(),
    };
}
