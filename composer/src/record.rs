use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::{error::RecordError, geom::BoundingBox, scene::Match};

/// One annotated scene as written to the dataset file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub filepath: String,
    pub matches: Vec<MatchRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub label: String,
    pub bounding_box: [[u32; 2]; 2],
    /// Row-major 0/255 values.
    pub match_mask: Vec<Vec<u8>>,
}

impl From<&Match> for MatchRecord {
    fn from(m: &Match) -> Self {
        Self {
            label: m.label.clone(),
            bounding_box: m.bbox.corners(),
            match_mask: m
                .mask
                .rows()
                .map(|row| row.map(|p| p[0]).collect())
                .collect(),
        }
    }
}

impl TryFrom<MatchRecord> for Match {
    type Error = RecordError;

    fn try_from(rec: MatchRecord) -> Result<Self, Self::Error> {
        let [[x1, y1], [x2, y2]] = rec.bounding_box;
        if x1 > x2 || y1 > y2 {
            return Err(RecordError::InvertedBox(rec.bounding_box));
        }
        let bbox = BoundingBox::new(x1, y1, x2, y2);

        let height = rec.match_mask.len();
        let width = rec.match_mask.first().map_or(0, Vec::len);
        if let Some((row, r)) = rec
            .match_mask
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != width)
        {
            return Err(RecordError::RaggedMask {
                row,
                found: r.len(),
                expected: width,
            });
        }
        if (width as u32, height as u32) != (bbox.width(), bbox.height()) {
            return Err(RecordError::MaskSizeMismatch {
                mask_width: width as u32,
                mask_height: height as u32,
                box_width: bbox.width(),
                box_height: bbox.height(),
            });
        }

        let mask = GrayImage::from_fn(width as u32, height as u32, |x, y| {
            Luma([rec.match_mask[y as usize][x as usize]])
        });
        Ok(Match {
            label: rec.label,
            bbox,
            mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_match() -> Match {
        Match {
            label: "4".into(),
            bbox: BoundingBox::at(10, 20, 3, 2),
            mask: GrayImage::from_fn(3, 2, |x, y| Luma([if x == y { 255 } else { 0 }])),
        }
    }

    #[test]
    fn json_shape_matches_dataset_format() {
        let rec = MatchRecord::from(&sample_match());
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "label": "4",
                "bounding_box": [[10, 20], [13, 22]],
                "match_mask": [[255, 0, 0], [0, 255, 0]],
            })
        );
    }

    #[test]
    fn match_survives_json_round_trip() {
        let original = sample_match();
        let text = serde_json::to_string(&MatchRecord::from(&original)).unwrap();
        let rec: MatchRecord = serde_json::from_str(&text).unwrap();
        let back = Match::try_from(rec).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn seed_is_optional() {
        let rec: AnnotationRecord =
            serde_json::from_str(r#"{"filepath": "1.png", "matches": []}"#).unwrap();
        assert_eq!(rec.seed, None);
        let text = serde_json::to_string(&rec).unwrap();
        assert!(!text.contains("seed"));
    }

    #[test]
    fn malformed_masks_are_rejected() {
        let mut rec = MatchRecord::from(&sample_match());
        rec.match_mask[1].pop();
        assert_eq!(
            Match::try_from(rec.clone()).unwrap_err(),
            RecordError::RaggedMask {
                row: 1,
                found: 2,
                expected: 3
            }
        );

        rec.match_mask.pop();
        assert!(matches!(
            Match::try_from(rec).unwrap_err(),
            RecordError::MaskSizeMismatch { .. }
        ));
    }
}
