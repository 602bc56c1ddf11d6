//! Multi-camera calibration text format.
//!
//! One block per camera, in file order:
//!
//! ```text
//! camera cam_00
//! intrinsic fx 0 cx 0 fy cy 0 0 1
//! extrinsic r00 r01 r02 tx r10 r11 r12 ty r20 r21 r22 tz
//! ```
//!
//! `intrinsic` is a row-major 3x3 K, `extrinsic` a row-major 3x4 `[R | t]`
//! mapping world to camera coordinates. `camera` lines, blank lines, and
//! `#` comments are separators; a camera is emitted as soon as both of its
//! matrices have been read.

use crate::core::Camera;
use crate::io::LoadError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

fn parse_floats<const N: usize>(
    parts: std::str::SplitWhitespace<'_>,
    what: &str,
    line_no: usize,
) -> Result<[f32; N], LoadError> {
    let mut out = [0.0f32; N];
    let mut count = 0;
    for token in parts {
        if count == N {
            return Err(LoadError::InvalidFormat(format!(
                "line {}: {} expects {} numbers, got more",
                line_no + 1,
                what,
                N
            )));
        }
        out[count] = token.parse().map_err(|_| {
            LoadError::InvalidFormat(format!("line {}: bad number '{}'", line_no + 1, token))
        })?;
        count += 1;
    }
    if count != N {
        return Err(LoadError::InvalidFormat(format!(
            "line {}: {} expects {} numbers, got {}",
            line_no + 1,
            what,
            N,
            count
        )));
    }
    Ok(out)
}

/// Load every camera from a calibration file, in file order.
pub fn load_calibration(path: &Path) -> Result<Vec<Camera>, LoadError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut cameras = Vec::new();
    let mut extrinsic: Option<[f32; 12]> = None;
    let mut intrinsic: Option<[f32; 9]> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let tag = match parts.next() {
            Some(tag) => tag,
            None => continue,
        };

        match tag {
            "camera" => {
                if extrinsic.is_some() || intrinsic.is_some() {
                    return Err(LoadError::InvalidFormat(format!(
                        "line {}: previous camera block is incomplete",
                        line_no + 1
                    )));
                }
            }
            "extrinsic" => {
                if extrinsic.is_some() {
                    return Err(LoadError::InvalidFormat(format!(
                        "line {}: duplicate extrinsic in camera block",
                        line_no + 1
                    )));
                }
                extrinsic = Some(parse_floats::<12>(parts, "extrinsic", line_no)?);
            }
            "intrinsic" => {
                if intrinsic.is_some() {
                    return Err(LoadError::InvalidFormat(format!(
                        "line {}: duplicate intrinsic in camera block",
                        line_no + 1
                    )));
                }
                intrinsic = Some(parse_floats::<9>(parts, "intrinsic", line_no)?);
            }
            _ => {}
        }

        if let (Some(e), Some(k)) = (&extrinsic, &intrinsic) {
            cameras.push(Camera::from_row_major(e, k));
            extrinsic = None;
            intrinsic = None;
        }
    }

    if extrinsic.is_some() || intrinsic.is_some() {
        return Err(LoadError::InvalidFormat(
            "file ends inside a camera block".to_string(),
        ));
    }
    if cameras.is_empty() {
        return Err(LoadError::InvalidFormat("no cameras found".to_string()));
    }

    log::debug!("loaded {} camera(s) from {}", cameras.len(), path.display());
    Ok(cameras)
}
