use std::fs;

use chrono::{Local, TimeZone};
use mfh_csv::{find_artifacts, ArtifactDir, CsvWriterConfig, MergeReducer};
use mfh_harvester::{Dataset, DatasetSink, DetailRecord, FeedItem, MergedRecord, Query};

fn listing(name: &str, address: &str, phone: &str) -> MergedRecord {
    MergedRecord::new(
        FeedItem::default(),
        DetailRecord {
            name: name.into(),
            address: address.into(),
            phone: phone.into(),
            ..Default::default()
        },
    )
}

fn dataset(position: usize, name: &str, records: Vec<MergedRecord>) -> Dataset {
    let mut dataset = Dataset::new(Query::new(
        position,
        name,
        format!("restaurant near {name}, New South Wales, Australia"),
    ));
    for record in records {
        dataset.push(Ok(record));
    }
    dataset
}

fn artifact_dir(root: &std::path::Path) -> ArtifactDir {
    let started = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    ArtifactDir::create(root, started, CsvWriterConfig::default()).unwrap()
}

#[test]
fn shared_listing_keeps_the_first_phone() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = artifact_dir(tmp.path());
    assert!(dir.path().ends_with("harvest-20240301T093000"));

    dir.write(&dataset(
        0,
        "Keiraville",
        vec![
            listing("Bombay Cafe", "1 Murphys Ave, Keiraville NSW 2500", "02 4229 1111"),
            listing("Keira Pizza", "2 Gipps Rd, Keiraville NSW 2500", "02 4229 2222"),
        ],
    ))
    .unwrap();
    dir.write(&dataset(
        1,
        "Gwynneville",
        vec![
            listing("BOMBAY CAFE", "1 murphys ave, keiraville nsw 2500", "02 9999 9999"),
            listing("Uni Bar", "Northfields Ave, Gwynneville NSW 2500", "02 4221 3333"),
        ],
    ))
    .unwrap();

    let artifacts = dir.artifacts().unwrap();
    assert_eq!(2, artifacts.len());
    assert!(artifacts[0].ends_with("0000-keiraville.csv"));

    let output = tmp.path().join("out").join("combined.csv");
    let summary = MergeReducer::default().merge(&artifacts, &output).unwrap();

    assert_eq!(2, summary.artifacts);
    assert_eq!(4, summary.read);
    assert_eq!(3, summary.written);
    assert_eq!(1, summary.duplicates);

    let mut rdr = csv::Reader::from_path(&output).unwrap();
    let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
    let names: Vec<_> = rows.iter().map(|r| r.get(0).unwrap()).collect();
    assert_eq!(vec!["Bombay Cafe", "Keira Pizza", "Uni Bar"], names);
    assert_eq!(Some("02 4229 1111"), rows[0].get(6));
    assert_eq!(Some("1 Murphys Ave, Keiraville NSW 2500"), rows[0].get(1));
}

#[test]
fn merging_twice_gives_the_same_output() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = artifact_dir(tmp.path());
    dir.write(&dataset(
        0,
        "Figtree",
        vec![
            listing("Fig Tree Cafe", "1 A St, Figtree NSW 2525", "1"),
            listing("fig tree cafe", "1 A ST, FIGTREE NSW 2525", "2"),
        ],
    ))
    .unwrap();
    let una_thai = listing("Una Thai", "2 B St, Unanderra NSW 2526", "3");
    dir.write(&dataset(1, "Unanderra", vec![una_thai])).unwrap();

    let artifacts = dir.artifacts().unwrap();
    let first = tmp.path().join("first.csv");
    let second = tmp.path().join("second.csv");
    let reducer = MergeReducer::default();
    reducer.merge(&artifacts, &first).unwrap();
    reducer.merge(&artifacts, &second).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn nothing_to_merge_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = artifact_dir(tmp.path());
    let path = dir.write(&dataset(0, "Nowhere", vec![])).unwrap();
    assert_eq!(0, fs::metadata(&path).unwrap().len());

    let output = tmp.path().join("combined.csv");
    let summary = MergeReducer::default()
        .merge(&dir.artifacts().unwrap(), &output)
        .unwrap();

    assert_eq!(0, summary.artifacts);
    assert_eq!(0, summary.written);
    assert!(!output.exists());
}

#[test]
fn columns_are_mapped_onto_the_first_schema() {
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("a.csv");
    let b = tmp.path().join("b.csv");
    fs::write(&a, "name,address,phone\nCafe,\"1 A St, Town\",111\n").unwrap();
    fs::write(&b, "phone,name,address\n222,Bar,2 B St\n333,CAFE,\"1 a st, town\"\n").unwrap();

    let combined = MergeReducer::default().reduce(&[&a, &b]).unwrap();

    assert_eq!(
        Some(csv::StringRecord::from(vec!["name", "address", "phone"])),
        combined.schema
    );
    assert_eq!(2, combined.records.len());
    assert_eq!(
        csv::StringRecord::from(vec!["Bar", "2 B St", "222"]),
        combined.records[1]
    );
    assert_eq!(1, combined.summary.duplicates);
}

#[test]
fn missing_columns_become_placeholders() {
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("a.csv");
    let b = tmp.path().join("b.csv");
    fs::write(&a, "name,address,website\nCafe,1 A St,cafe.com\n").unwrap();
    fs::write(&b, "name,address\nBar,2 B St\n").unwrap();

    let combined = MergeReducer::default().reduce(&[a, b]).unwrap();

    assert_eq!(Some("N/A"), combined.records[1].get(2));
}

#[test]
fn artifacts_found_by_pattern_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    for name in ["0002-c.csv", "0000-a.csv", "0001-b.csv", "notes.txt"] {
        fs::write(tmp.path().join(name), "").unwrap();
    }

    let pattern = tmp.path().join("*.csv");
    let found = find_artifacts(&pattern.to_string_lossy()).unwrap();

    let names: Vec<_> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(vec!["0000-a.csv", "0001-b.csv", "0002-c.csv"], names);
}

#[test]
fn artifacts_listed_under_a_bracketed_work_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = artifact_dir(&tmp.path().join("run[1]"));
    let written = dir
        .write(&dataset(
            0,
            "Keiraville",
            vec![listing("Bombay Cafe", "1 Murphys Ave, Keiraville NSW 2500", "1")],
        ))
        .unwrap();
    fs::write(dir.path().join("notes.txt"), "").unwrap();

    let artifacts = dir.artifacts().unwrap();
    assert_eq!(vec![written], artifacts);

    let output = tmp.path().join("combined.csv");
    let summary = MergeReducer::default().merge(&artifacts, &output).unwrap();
    assert_eq!(1, summary.written);
    assert!(output.exists());
}
