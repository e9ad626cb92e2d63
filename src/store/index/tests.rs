use super::*;
use tempfile::TempDir;

fn sample_index() -> FlatIndex {
    let mut index = FlatIndex::new(2);
    index
        .add(&[vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 3.0], vec![1.0, 0.0]])
        .expect("add should succeed");
    index
}

#[test]
fn add_assigns_sequential_offsets() {
    let index = sample_index();
    assert_eq!(index.len(), 4);
    assert_eq!(index.vector(2), Some(&[0.0, 3.0][..]));
    assert_eq!(index.vector(4), None);
}

#[test]
fn add_rejects_wrong_width() {
    let mut index = FlatIndex::new(3);
    let err = index
        .add(&[vec![1.0, 2.0, 3.0], vec![1.0]])
        .expect_err("mixed widths should fail");
    assert!(matches!(err, RagError::Index(_)));
    assert!(index.is_empty(), "a rejected batch must not be partially applied");
}

#[test]
fn search_orders_by_distance_then_offset() {
    let index = sample_index();
    let results = index.search(&[0.9, 0.0], 4).expect("search should succeed");

    let offsets: Vec<usize> = results.iter().map(|(offset, _)| *offset).collect();
    assert_eq!(offsets, vec![1, 3, 0, 2]);
    assert!((results[0].1 - 0.01).abs() < 1e-6);
    assert!(results.windows(2).all(|w| w[0].1 <= w[1].1));
}

#[test]
fn search_returns_all_when_k_exceeds_len() {
    let index = sample_index();
    assert_eq!(index.search(&[0.0, 0.0], 100).expect("search").len(), 4);
    assert!(index.search(&[0.0, 0.0], 0).expect("search").is_empty());
}

#[test]
fn search_on_empty_index() {
    let index = FlatIndex::new(2);
    assert!(index.search(&[1.0, 1.0], 3).expect("search").is_empty());
}

#[test]
fn search_rejects_wrong_query_width() {
    let index = sample_index();
    assert!(index.search(&[1.0, 1.0, 1.0], 1).is_err());
}

#[test]
fn truncate_rolls_back() {
    let mut index = sample_index();
    index.truncate(1);
    assert_eq!(index.len(), 1);
    assert_eq!(index.vector(0), Some(&[0.0, 0.0][..]));
}

#[test]
fn save_and_load_round_trip() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("vectors.index");

    let index = sample_index();
    index.save(&path).expect("save should succeed");
    assert!(!dir.path().join("vectors.index.tmp").exists());

    let loaded = FlatIndex::load(&path, 2).expect("load should succeed");
    assert_eq!(loaded, index);

    let header = FlatIndex::read_header(&path).expect("header should read");
    assert_eq!(
        header,
        IndexHeader {
            dimension: 2,
            count: 4
        }
    );
}

#[test]
fn load_missing_file_is_empty() {
    let dir = TempDir::new().expect("should create temp dir");
    let index = FlatIndex::load(&dir.path().join("vectors.index"), 384).expect("load");
    assert!(index.is_empty());
    assert_eq!(index.dimension(), 384);
}

#[test]
fn load_refuses_dimension_mismatch() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("vectors.index");

    let mut index = FlatIndex::new(384);
    index.add(&[vec![0.5; 384]]).expect("add");
    index.save(&path).expect("save");

    let err = FlatIndex::load(&path, 768).expect_err("mismatch should fail");
    assert!(matches!(
        err,
        RagError::DimensionMismatch {
            persisted: 384,
            configured: 768
        }
    ));
    let message = err.to_string();
    assert!(message.contains("384"));
    assert!(message.contains("768"));
}

#[test]
fn load_rejects_foreign_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("vectors.index");
    fs::write(&path, b"definitely not an index file at all").expect("write");

    let err = FlatIndex::load(&path, 2).expect_err("foreign file should fail");
    assert!(matches!(err, RagError::Index(_)));
}

#[test]
fn load_rejects_truncated_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("vectors.index");
    sample_index().save(&path).expect("save");

    let bytes = fs::read(&path).expect("read");
    fs::write(&path, &bytes[..bytes.len() - 3]).expect("write");

    let err = FlatIndex::load(&path, 2).expect_err("truncated file should fail");
    assert!(err.to_string().contains("truncated"));
}
