use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use findls_core::{
    summarize_lines, summarize_path, summarize_reader, AggregationStrategy, OptionsBuilder, Stat,
    StatMap, SummaryError,
};

const SCENARIO: &str = "\
1 2 drwxr-xr-x 3 u g 4096 Jan 1 00:00 /a
3 4 -rw-r--r-- 1 u g 100 Jan 1 00:00 /a/b.txt
5 6 -rw-r--r-- 1 u g 200 Jan 1 00:00 /a/c/d.txt
";

fn stat(files: u64, dirs: u64, size: u64) -> Stat {
    Stat { files, dirs, size }
}

fn ordered(map: StatMap) -> BTreeMap<String, Stat> {
    map.into_iter().collect()
}

#[test]
fn scenario_buckets() {
    let s = summarize_lines(SCENARIO.lines());
    assert_eq!(s.map.len(), 5);
    assert_eq!(s.get("/"), Some(&stat(2, 1, 4396)));
    assert_eq!(s.get("/a"), Some(&stat(2, 1, 4396)));
    assert_eq!(s.get("/a/c"), Some(&stat(1, 0, 200)));
    assert_eq!(s.get("/a/b.txt"), Some(&stat(1, 0, 100)));
    assert_eq!(s.get("/a/c/d.txt"), Some(&stat(1, 0, 200)));
    let order: Vec<&str> = s.sorted().into_iter().map(|(p, _)| p).collect();
    assert_eq!(order, vec!["/", "/a", "/a/b.txt", "/a/c", "/a/c/d.txt"]);
}

#[test]
fn noise_lines_are_ignored() {
    let mut text = String::from("header line that is not a listing\n\n");
    text.push_str(SCENARIO);
    text.push_str("1 2 drwxr-xr-x 3\nfind: '/proc/1': Permission denied\n");
    let s = summarize_lines(text.lines());
    assert_eq!(s.stats.lines_parsed, 3);
    assert_eq!(s.stats.lines_skipped, 4);
    assert_eq!(s.get("/"), Some(&stat(2, 1, 4396)));
}

#[test]
fn order_does_not_change_totals() {
    let lines: Vec<&str> = SCENARIO.lines().collect();
    let baseline = ordered(summarize_lines(lines.iter().copied()).map);
    let perms: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for perm in perms {
        let got = ordered(summarize_lines(perm.iter().map(|&i| lines[i])).map);
        assert_eq!(got, baseline, "permutation {perm:?}");
    }
}

fn synthetic_listing(n: usize) -> String {
    let mut s = String::new();
    for d in 0..10 {
        s.push_str(&format!(
            "{d} 8 drwxr-xr-x 2 u g 4096 Feb 2 2020 /srv/tree/dir {d}\n"
        ));
    }
    for i in 0..n {
        s.push_str(&format!(
            "{} 8 -rw-r--r-- 1 u g {} Feb 2 12:30 /srv/tree/dir {}/sub{}/file {i}.bin\n",
            100 + i,
            (i * 37) % 5000,
            i % 10,
            i % 3
        ));
    }
    s
}

#[test]
fn worker_count_and_strategy_do_not_change_totals() {
    let text = synthetic_listing(5000);
    let baseline = ordered(summarize_lines(text.lines()).map);
    for threads in [1, 2, 8] {
        for strategy in [AggregationStrategy::PerWorker, AggregationStrategy::Shared] {
            let opt = OptionsBuilder::new()
                .threads(threads)
                .batch_lines(64)
                .strategy(strategy)
                .build();
            let s = summarize_reader(Cursor::new(text.as_bytes()), &opt).unwrap();
            assert_eq!(s.stats.lines_parsed, 5010);
            assert_eq!(
                ordered(s.map),
                baseline,
                "threads={threads} strategy={strategy:?}"
            );
        }
    }
}

#[test]
fn paths_with_spaces_roll_up_by_separator() {
    let text = synthetic_listing(30);
    let s = summarize_lines(text.lines());
    let dir0 = s.get("/srv/tree/dir 0").unwrap();
    // own entry plus 3 files (i = 0, 10, 20)
    assert_eq!((dir0.files, dir0.dirs), (3, 1));
    assert_eq!(s.get("/srv/tree").unwrap().files, 30);
    assert_eq!(s.get("/srv/tree").unwrap().dirs, 10);
}

#[test]
fn summarize_path_reads_file() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(SCENARIO.as_bytes()).unwrap();
    f.flush().unwrap();
    let opt = OptionsBuilder::new().threads(2).build();
    let s = summarize_path(f.path(), &opt).unwrap();
    assert_eq!(s.get("/a"), Some(&stat(2, 1, 4396)));
}

#[test]
fn missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.txt");
    let err = summarize_path(&missing, &OptionsBuilder::new().build()).unwrap_err();
    match err.downcast_ref::<SummaryError>() {
        Some(SummaryError::Open { path, .. }) => assert_eq!(path, &missing),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn distinct_non_utf8_paths_are_never_merged() {
    let mut bytes = b"1 2 -rw-r--r-- 1 u g 1 Jan 1 00:00 /x/ok\n".to_vec();
    bytes.extend_from_slice(b"1 2 -rw-r--r-- 1 u g 5 Jan 1 00:00 /x/\xff\n");
    bytes.extend_from_slice(b"1 2 -rw-r--r-- 1 u g 7 Jan 1 00:00 /x/\xfe\n");
    let opt = OptionsBuilder::new().threads(1).build();
    let s = summarize_reader(Cursor::new(bytes), &opt).unwrap();
    assert_eq!(s.stats.lines_skipped, 2);
    assert!(s.map.keys().all(|k| !k.contains('\u{FFFD}')));
    assert_eq!(
        ordered(s.map),
        BTreeMap::from([
            ("/".to_string(), stat(1, 0, 1)),
            ("/x".to_string(), stat(1, 0, 1)),
            ("/x/ok".to_string(), stat(1, 0, 1)),
        ])
    );
}
