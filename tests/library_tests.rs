//! Integration tests for the attachment library over a real directory tree.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use mailsmoke::error::SmokeError;
use mailsmoke::library::AttachmentLibrary;
use mailsmoke::parser::size::parse_size;
use mailsmoke::template::{self, RenderContext};

/// Five 1000-byte files and one 2000-byte file, two of them under `subdir/`.
fn fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    temp.child("subdir").create_dir_all().unwrap();
    for name in [
        "root_file_1.txt",
        "root_file_2.txt",
        "subdir/subfile_1.txt",
        "subdir/subfile_2.txt",
        "pdf_file.pdf",
    ] {
        temp.child(name).write_binary(&[b'a'; 1000]).unwrap();
    }
    temp.child("big_file.txt").write_binary(&[b'b'; 2000]).unwrap();
    temp
}

fn names(library: &AttachmentLibrary) -> Vec<String> {
    library
        .iter()
        .filter_map(|a| a.file_name().map(String::from))
        .collect()
}

// ─── Size parsing ───────────────────────────────────────────────────

#[test]
fn test_parse_size_unit_table() {
    assert_eq!(parse_size("5kb").unwrap(), 5000);
    assert_eq!(parse_size("1kib").unwrap(), 1024);
    assert_eq!(parse_size("5.5k").unwrap(), 5500);
    assert_eq!(parse_size("1").unwrap(), 1);
    assert_eq!(parse_size("5     KB").unwrap(), 5000);
    assert_eq!(parse_size("1ki").unwrap(), 1024);
}

#[test]
fn test_parse_size_rejects_malformed() {
    for input in ["5..5k", "abc123", "5hb"] {
        assert!(
            matches!(parse_size(input), Err(SmokeError::InvalidFormat { .. })),
            "{input} should be rejected"
        );
    }
}

// ─── Building ───────────────────────────────────────────────────────

#[test]
fn test_build_over_fixture() {
    let temp = fixture();
    let library = AttachmentLibrary::build(&[temp.path()]);
    assert_eq!(library.len(), 6);
    assert_eq!(library.total_size(), 7000);
    assert_eq!(
        names(&library),
        vec![
            "big_file.txt",
            "pdf_file.pdf",
            "root_file_1.txt",
            "root_file_2.txt",
            "subfile_1.txt",
            "subfile_2.txt",
        ]
    );
}

#[test]
fn test_build_with_separate_roots() {
    let top = TempDir::new().unwrap();
    let other = TempDir::new().unwrap();
    top.child("root_file_1.txt").write_binary(&[0; 1000]).unwrap();
    other.child("subdir").create_dir_all().unwrap();
    other
        .child("subdir/subfile_1.txt")
        .write_binary(&[0; 1000])
        .unwrap();

    let library = AttachmentLibrary::build(&[top.path(), other.child("subdir").path()]);
    assert_eq!(names(&library), vec!["root_file_1.txt", "subfile_1.txt"]);
}

#[test]
fn test_build_reports_progress() {
    let temp = fixture();
    let seen = std::cell::Cell::new((0u64, 0u64));
    let library =
        AttachmentLibrary::build_with_progress(&[temp.path()], Some(&|files, bytes| seen.set((files, bytes))));
    assert_eq!(seen.get(), (6, 7000));
    assert_eq!(library.len(), 6);
}

#[test]
fn test_build_does_not_touch_files() {
    let temp = fixture();
    let _ = AttachmentLibrary::build(&[temp.path()]);
    temp.child("subdir/subfile_2.txt")
        .assert(predicate::path::is_file());
    temp.child("big_file.txt")
        .assert(predicate::path::is_file());
}

// ─── Queries ────────────────────────────────────────────────────────

#[test]
fn test_queries_over_fixture() {
    let temp = fixture();
    let library = AttachmentLibrary::build(&[temp.path()]);

    let exact = library.by_exact_name("root_file_1.txt");
    assert_eq!(exact.len(), 1);
    let path = exact.attachments()[0].path.to_string_lossy().into_owned();
    assert!(predicate::str::ends_with("root_file_1.txt").eval(path.as_str()));

    assert_eq!(
        names(&library.by_contains("subfile")),
        vec!["subfile_1.txt", "subfile_2.txt"]
    );
    assert_eq!(library.by_extension("pdf").len(), 1);
}

#[test]
fn test_size_range_over_fixture() {
    let temp = fixture();
    let library = AttachmentLibrary::build(&[temp.path()]);
    assert_eq!(library.by_size_range(0, 0).len(), 6);
    assert_eq!(library.by_size_range(1500, 0).len(), 1);
    assert_eq!(library.by_size_range(0, 1500).len(), 5);
    assert_eq!(library.by_size_range(500, 2500).len(), 6);
}

#[test]
fn test_sample_over_fixture() {
    let temp = fixture();
    let library = AttachmentLibrary::build(&[temp.path()]);

    let first = library.sample(2, 1337).unwrap();
    let second = library.sample(2, 1337).unwrap();
    assert_eq!(first.paths(), second.paths());
    assert_eq!(first.len(), 2);

    assert!(matches!(
        library.sample(7, 1337),
        Err(SmokeError::InsufficientItems {
            requested: 7,
            available: 6
        })
    ));
}

#[test]
fn test_filter_order_does_not_matter() {
    let temp = fixture();
    let library = AttachmentLibrary::build(&[temp.path()]);
    let a = library.by_extension("txt").by_directory("subdir");
    let b = library.by_directory("subdir").by_extension("txt");
    assert_eq!(a, b);
    assert_eq!(names(&a), vec!["subfile_1.txt", "subfile_2.txt"]);
}

// ─── Template bindings ──────────────────────────────────────────────

#[test]
fn test_template_filters_over_fixture() {
    let temp = fixture();
    let library = AttachmentLibrary::build(&[temp.path()]);
    let env = template::create_environment();
    let ctx = RenderContext::new(library);

    let out = template::render(
        &env,
        r#"{{ library | by_exact_name("root_file_1.txt") | to_list }}"#,
        &ctx,
    )
    .unwrap();
    assert!(out.starts_with("- "));
    assert!(out.ends_with("root_file_1.txt"));
    assert_eq!(out.lines().count(), 1);

    let out = template::render(
        &env,
        r#"{{ library | filesize("1.5kb") | length }} {{ library | by_directory("subdir") | filetype("txt") | length }}"#,
        &ctx,
    )
    .unwrap();
    assert_eq!(out, "1 2");
}

#[test]
fn test_template_query_over_fixture() {
    let temp = fixture();
    let env = template::create_environment();
    let ctx = RenderContext::new(AttachmentLibrary::build(&[temp.path()]));

    let picked = template::query(&env, r#"filesize(maximum="1kb") | sample(3, seed=9)"#, &ctx).unwrap();
    assert_eq!(picked.len(), 3);
    assert!(picked.iter().all(|a| a.size == 1000));

    let err = template::query(&env, "sample(10, 1)", &ctx).unwrap_err();
    assert!(err.to_string().contains("10"));
}
