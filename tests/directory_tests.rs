//! Integration tests for directory ingestion.
//!
//! Tests level-by-level dependency seeding and traversal order.

mod common;

use common::{NESTED, SCALAR_AND_VECTOR, TestEnv};

#[test]
fn test_subdirectory_depends_on_parent_level() {
    let mut env = TestEnv::new();
    let f1 = env.write_doc("root/f1.json", SCALAR_AND_VECTOR);
    let f2 = env.write_doc("root/sub/f2.json", NESTED);

    let report = env.ingest_dir(&env.path("root"), &[]);

    assert_eq!(report.directories, 2);
    let order: Vec<String> = report.files.iter().map(|r| r.filepath.clone()).collect();
    assert_eq!(
        order,
        vec![f1.to_string_lossy().into_owned(), f2.to_string_lossy().into_owned()]
    );

    let n1 = env.file_node(&f1);
    let n2 = env.file_node(&f2);
    assert_eq!(env.dependency_paths(n2.id), vec![f1.to_string_lossy().into_owned()]);
    assert!(env.dependency_paths(n1.id).is_empty());
}

#[test]
fn test_only_immediate_level_is_seed() {
    let mut env = TestEnv::new();
    let f1 = env.write_doc("root/f1.json", SCALAR_AND_VECTOR);
    let f2 = env.write_doc("root/sub/f2.json", SCALAR_AND_VECTOR);
    let f3 = env.write_doc("root/sub/deep/f3.json", SCALAR_AND_VECTOR);

    env.ingest_dir(&env.path("root"), &[]);

    let n3 = env.file_node(&f3);
    assert_eq!(env.dependency_paths(n3.id), vec![f2.to_string_lossy().into_owned()]);
    assert!(!env.dependency_paths(n3.id).contains(&f1.to_string_lossy().into_owned()));
}

#[test]
fn test_siblings_share_seed_not_each_other() {
    let mut env = TestEnv::new();
    let top = env.write_doc("root/top.json", SCALAR_AND_VECTOR);
    let a = env.write_doc("root/a/fa.json", SCALAR_AND_VECTOR);
    let b = env.write_doc("root/b/fb.json", SCALAR_AND_VECTOR);

    env.ingest_dir(&env.path("root"), &[]);

    let top = top.to_string_lossy().into_owned();
    let na = env.file_node(&a);
    let nb = env.file_node(&b);
    assert_eq!(env.dependency_paths(na.id), vec![top.clone()]);
    assert_eq!(env.dependency_paths(nb.id), vec![top]);
}

#[test]
fn test_every_file_of_a_level_is_linked() {
    let mut env = TestEnv::new();
    let p = env.write_doc("root/p.json", SCALAR_AND_VECTOR);
    let q = env.write_doc("root/q.json", SCALAR_AND_VECTOR);
    let child = env.write_doc("root/sub/c.json", NESTED);

    env.ingest_dir(&env.path("root"), &[]);

    let node = env.file_node(&child);
    assert_eq!(
        env.dependency_paths(node.id),
        vec![p.to_string_lossy().into_owned(), q.to_string_lossy().into_owned()]
    );
    assert_eq!(env.stats().depends_on, 2);
}

#[test]
fn test_root_level_uses_explicit_seed() {
    let mut env = TestEnv::new();
    let base = env.write_doc("base.json", SCALAR_AND_VECTOR);
    env.ingest(&base, &[]);
    let f1 = env.write_doc("root/f1.json", NESTED);

    env.ingest_dir(&env.path("root"), &[base.clone()]);

    let n1 = env.file_node(&f1);
    assert_eq!(env.dependency_paths(n1.id), vec![base.to_string_lossy().into_owned()]);
}

#[test]
fn test_empty_level_passes_empty_seed() {
    let mut env = TestEnv::new();
    let f = env.write_doc("root/sub/f.json", NESTED);

    let report = env.ingest_dir(&env.path("root"), &[]);

    assert_eq!(report.files.len(), 1);
    let node = env.file_node(&f);
    assert!(env.dependency_paths(node.id).is_empty());
}

#[test]
fn test_non_container_files_ignored() {
    let mut env = TestEnv::new();
    env.write_doc("root/readme.txt", "not a container");
    env.write_doc("root/f.json", SCALAR_AND_VECTOR);

    let report = env.ingest_dir(&env.path("root"), &[]);

    assert_eq!(report.files.len(), 1);
    assert_eq!(env.stats().files, 1);
}

#[test]
fn test_directory_totals() {
    let mut env = TestEnv::new();
    env.write_doc("root/f1.json", SCALAR_AND_VECTOR);
    env.write_doc("root/sub/f2.json", SCALAR_AND_VECTOR);

    let report = env.ingest_dir(&env.path("root"), &[]);

    let total = report.total();
    // f1: File, x, y; f2: File, y (x is shared)
    assert_eq!(total.nodes_created, 5);
    // four holds edges plus f2 -> f1
    assert_eq!(total.relationships_created, 5);
}
