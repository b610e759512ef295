//! Merging of duplicate detections. Overlapping perspective views see the
//! same text more than once; overlapping spherical boxes are collapsed into
//! the highest-confidence detection, whose box grows to cover the merged
//! ones.

use crate::recognizer::SphericalDetection;

/// Deduplicates detections in place.
///
/// Detections are sorted by confidence descending, then each one is compared
/// against every higher-confidence detection using the original boxes. A
/// detection merges into a kept one when either box contains the other, or
/// when IoU or overlap ratio (intersection over the smaller area, which
/// catches a small box inside a large one) exceeds the threshold. Merged
/// boxes union into the kept detection; the kept detection's text and
/// confidence stay as they were.
pub fn deduplicate(detections: &mut Vec<SphericalDetection>, iou_threshold: f32) {
    if detections.len() <= 1 {
        return;
    }

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Compare against original boxes so earlier merges cannot chain a growing
    // box across unrelated detections.
    let original_rects: Vec<_> = detections.iter().map(|d| d.rect).collect();

    let mut keep_flags = vec![true; detections.len()];
    let mut merge_operations = Vec::new();

    #[allow(clippy::needless_range_loop)]
    for current_index in 0..detections.len() {
        if !keep_flags[current_index] {
            continue;
        }

        for kept_index in 0..current_index {
            let current_rect = original_rects[current_index];
            let kept_rect = original_rects[kept_index];

            if kept_rect.contains(&current_rect) || current_rect.contains(&kept_rect) {
                merge_operations.push((current_index, kept_index));
                keep_flags[current_index] = false;
                break;
            }

            let iou = current_rect.iou(&kept_rect);
            let overlap_ratio = current_rect.overlap_ratio(&kept_rect);

            if iou > iou_threshold || overlap_ratio > iou_threshold {
                merge_operations.push((current_index, kept_index));
                keep_flags[current_index] = false;
                break;
            }
        }
    }

    for (merge_from_idx, merge_to_idx) in merge_operations {
        let merge_from_rect = original_rects[merge_from_idx];
        detections[merge_to_idx].rect = detections[merge_to_idx].rect.union(&merge_from_rect);
    }

    let mut keep_index = 0;
    #[allow(clippy::needless_range_loop)]
    for current_index in 0..detections.len() {
        if keep_flags[current_index] {
            if keep_index != current_index {
                detections.swap(keep_index, current_index);
            }
            keep_index += 1;
        }
    }

    detections.truncate(keep_index);
}
