use super::*;

#[test]
fn test_sequential_preserves_order() {
    let out = Sequential.map_tasks(10, |i| i * 3);
    assert_eq!(out, (0..10).map(|i| i * 3).collect::<Vec<_>>());
}

#[test]
fn test_rayon_preserves_order() {
    let out = RayonPool.map_tasks(1000, |i| i as u64 * 7);
    for (i, &v) in out.iter().enumerate() {
        assert_eq!(v, i as u64 * 7);
    }
}

#[test]
fn test_empty_task_list() {
    assert!(Sequential.map_tasks(0, |i| i).is_empty());
    assert!(RayonPool.map_tasks(0, |i| i).is_empty());
}

#[test]
fn test_executors_agree() {
    let data: Vec<f64> = (0..257).map(|i| (i as f64 * 0.37).sin()).collect();
    let task = |i: usize| data[i] * data[(i + 1) % data.len()];
    assert_eq!(Sequential.map_tasks(data.len(), task), RayonPool.map_tasks(data.len(), task));
}

#[test]
fn test_auto_chunk_size_minimum() {
    assert_eq!(auto_chunk_size(0), 1);
    assert!(auto_chunk_size(1_000_000) >= 1);
}
