use crate::shared::bounding_box::BoundingBox;

/// Class-agnostic greedy NMS.
///
/// Candidates whose score is not strictly above `score_floor` are dropped.
/// The rest are visited in descending score order (ties keep input order);
/// each visited box is kept unless a previously kept box overlaps it with
/// IoU greater than `iou_threshold`.
///
/// Returns indices into `boxes`/`scores`, highest score first.
pub fn non_max_suppression(
    boxes: &[BoundingBox],
    scores: &[f32],
    score_floor: f32,
    iou_threshold: f32,
) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len(), "one score per box");

    let mut order: Vec<usize> = (0..boxes.len().min(scores.len()))
        .filter(|&i| scores[i] > score_floor)
        .collect();
    // Stable, so equal scores stay in input order
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; order.len()];

    for i in 0..order.len() {
        if suppressed[i] {
            continue;
        }
        let kept = &boxes[order[i]];
        keep.push(order[i]);
        for j in (i + 1)..order.len() {
            if suppressed[j] {
                continue;
            }
            if kept.iou(&boxes[order[j]]) > iou_threshold as f64 {
                suppressed[j] = true;
            }
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bx(left: i32, top: i32, width: i32, height: i32) -> BoundingBox {
        BoundingBox::new(left, top, width, height)
    }

    #[test]
    fn test_empty_input() {
        assert!(non_max_suppression(&[], &[], 0.0, 0.5).is_empty());
    }

    #[test]
    fn test_suppresses_overlapping_lower_score() {
        let boxes = [bx(0, 0, 100, 100), bx(5, 5, 100, 100)];
        let kept = non_max_suppression(&boxes, &[0.8, 0.9], 0.0, 0.5);
        assert_eq!(kept, vec![1]);
    }

    #[test]
    fn test_keeps_overlap_at_threshold() {
        // IoU = 50*100 / (2*100*100 - 50*100) = 1/3
        let boxes = [bx(0, 0, 100, 100), bx(50, 0, 100, 100)];
        let iou = boxes[0].iou(&boxes[1]) as f32;

        let kept = non_max_suppression(&boxes, &[0.9, 0.8], 0.0, iou);
        assert_eq!(kept, vec![0, 1]);

        let kept = non_max_suppression(&boxes, &[0.9, 0.8], 0.0, iou - 1e-3);
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn test_keeps_non_overlapping() {
        let boxes = [bx(0, 0, 50, 50), bx(200, 200, 50, 50)];
        let kept = non_max_suppression(&boxes, &[0.7, 0.9], 0.0, 0.5);
        assert_eq!(kept, vec![1, 0]);
    }

    #[test]
    fn test_is_class_agnostic_by_construction() {
        // Two heavily overlapping boxes collapse no matter what they represent
        let boxes = [bx(10, 10, 80, 80), bx(12, 12, 80, 80)];
        let kept = non_max_suppression(&boxes, &[0.6, 0.95], 0.0, 0.45);
        assert_eq!(kept, vec![1]);
    }

    #[test]
    fn test_score_floor_is_strict() {
        let boxes = [bx(0, 0, 10, 10), bx(100, 100, 10, 10)];
        let kept = non_max_suppression(&boxes, &[0.45, 0.46], 0.45, 0.5);
        assert_eq!(kept, vec![1]);
    }

    #[test]
    fn test_suppressed_box_does_not_suppress_others() {
        // b overlaps a and c; a suppresses b, so c must survive even though
        // it overlaps b.
        let a = bx(0, 0, 100, 100);
        let b = bx(40, 0, 100, 100);
        let c = bx(80, 0, 100, 100);
        let kept = non_max_suppression(&[a, b, c], &[0.9, 0.8, 0.7], 0.0, 0.3);
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let boxes = [bx(0, 0, 10, 10), bx(1, 1, 10, 10)];
        let kept = non_max_suppression(&boxes, &[0.5, 0.5], 0.0, 0.3);
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let boxes = vec![
            bx(0, 0, 100, 100),
            bx(10, 10, 100, 100),
            bx(300, 300, 50, 50),
            bx(310, 305, 50, 50),
            bx(600, 0, 40, 80),
            bx(90, 0, 100, 100),
        ];
        let scores = vec![0.9, 0.85, 0.6, 0.7, 0.5, 0.65];

        let first = non_max_suppression(&boxes, &scores, 0.3, 0.45);
        let kept_boxes: Vec<BoundingBox> = first.iter().map(|&i| boxes[i]).collect();
        let kept_scores: Vec<f32> = first.iter().map(|&i| scores[i]).collect();

        let second = non_max_suppression(&kept_boxes, &kept_scores, 0.3, 0.45);
        assert_eq!(second, (0..kept_boxes.len()).collect::<Vec<_>>());
    }
}
