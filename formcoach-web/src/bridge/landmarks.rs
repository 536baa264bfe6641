//! Flat landmark arrays from JavaScript
//!
//! MediaPipe results arrive as one Float32Array per frame, 33 landmarks in
//! index order:
//! - 132 values: x, y, z, visibility
//! - 99 values: x, y, z (visibility taken as 1.0)
//!
//! A landmark with a non-finite x or y is left absent.

use crate::error::FrameError;
use crate::physics::{Landmark, LandmarkFrame, PoseLandmark, LANDMARK_COUNT};

pub const XYZV_LEN: usize = LANDMARK_COUNT * 4;
pub const XYZ_LEN: usize = LANDMARK_COUNT * 3;

pub fn parse_landmarks(data: &[f32], timestamp: f64) -> Result<LandmarkFrame, FrameError> {
    let stride = match data.len() {
        XYZV_LEN => 4,
        XYZ_LEN => 3,
        len => {
            return Err(FrameError::BadLength {
                len,
                expected_xyzv: XYZV_LEN,
                expected_xyz: XYZ_LEN,
            })
        }
    };

    let mut frame = LandmarkFrame::empty(timestamp);
    for (id, chunk) in PoseLandmark::ALL.iter().zip(data.chunks_exact(stride)) {
        let (x, y, z) = (chunk[0], chunk[1], chunk[2]);
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        let visibility = if stride == 4 { chunk[3] } else { 1.0 };
        let mut landmark = Landmark::new(x, y, visibility);
        if z.is_finite() {
            landmark = landmark.with_depth(z);
        }
        frame.set(*id, landmark);
    }
    Ok(frame)
}

/// Parse, warning on the browser console and dropping the frame on error
pub(crate) fn parse_or_warn(data: &[f32], timestamp: f64) -> Option<LandmarkFrame> {
    match parse_landmarks(data, timestamp) {
        Ok(frame) => Some(frame),
        Err(e) => {
            web_sys::console::warn_1(&e.to_string().into());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xyzv_layout() {
        let mut data = vec![0.0f32; XYZV_LEN];
        let k = PoseLandmark::RightKnee.index() * 4;
        data[k..k + 4].copy_from_slice(&[0.4, 0.6, -0.1, 0.8]);

        let frame = parse_landmarks(&data, 1.5).unwrap();
        let knee = frame.get(PoseLandmark::RightKnee).unwrap();
        assert_eq!(knee.position.x, 0.4);
        assert_eq!(knee.position.y, 0.6);
        assert_eq!(knee.z, Some(-0.1));
        assert_eq!(knee.visibility, 0.8);
        assert_eq!(frame.timestamp, 1.5);
        assert_eq!(frame.detected_count(), LANDMARK_COUNT);
    }

    #[test]
    fn test_xyz_layout_full_visibility() {
        let data = vec![0.5f32; XYZ_LEN];
        let frame = parse_landmarks(&data, 0.0).unwrap();
        assert_eq!(frame.get(PoseLandmark::Nose).unwrap().visibility, 1.0);
    }

    #[test]
    fn test_nan_landmark_left_absent() {
        let mut data = vec![0.5f32; XYZ_LEN];
        data[PoseLandmark::LeftWrist.index() * 3] = f32::NAN;
        let frame = parse_landmarks(&data, 0.0).unwrap();
        assert!(frame.get(PoseLandmark::LeftWrist).is_none());
        assert_eq!(frame.detected_count(), LANDMARK_COUNT - 1);
    }

    #[test]
    fn test_bad_length() {
        let err = parse_landmarks(&[0.0; 10], 0.0).unwrap_err();
        assert_eq!(
            err,
            FrameError::BadLength {
                len: 10,
                expected_xyzv: 132,
                expected_xyz: 99,
            }
        );
    }
}
