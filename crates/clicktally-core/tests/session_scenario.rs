use clicktally_core::{Controller, CsvExporter, ExportRecord, Phase, CSV_HEADERS};
use std::time::Duration;

fn controller() -> Controller {
    Controller::new(CsvExporter::default(), Duration::from_secs(3600))
}

#[test]
fn count_five_clicks_over_three_seconds_then_export() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = controller();

    assert_eq!(c.toggle_counting(), Phase::Counting);
    for _ in 0..5 {
        c.on_notification();
    }
    for _ in 0..3 {
        c.on_tick();
    }
    assert_eq!(c.toggle_counting(), Phase::Paused);

    let receipt = c
        .export(Some(dir.path().to_path_buf()), "warm-up round")
        .unwrap();

    let mut reader = csv::Reader::from_path(&receipt.path).unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        CSV_HEADERS.to_vec()
    );
    let rows: Vec<ExportRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].clicks, 5);
    assert_eq!(rows[0].duration_seconds, 3);
    assert_eq!(rows[0].comment, "warm-up round");

    let snap = c.snapshot();
    assert_eq!(
        (snap.click_count, snap.elapsed_seconds, snap.is_counting),
        (0, 0, false)
    );
}

#[test]
fn consecutive_sessions_append_to_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = controller().with_output_folder(Some(dir.path().to_path_buf()));

    for clicks in [2u64, 4] {
        c.toggle_counting();
        for _ in 0..clicks {
            c.on_notification();
        }
        c.on_tick();
        c.export(None, "").unwrap();
    }

    let path = dir.path().join("click_data.csv");
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.matches("Timestamp,Clicks").count(), 1);

    let rows: Vec<ExportRecord> = csv::Reader::from_path(&path)
        .unwrap()
        .deserialize()
        .map(|r| r.unwrap())
        .collect();
    let clicks: Vec<u64> = rows.iter().map(|r| r.clicks).collect();
    assert_eq!(clicks, vec![2, 4]);
}

#[test]
fn toggling_repeatedly_never_double_counts() {
    let mut c = controller();
    let mut expected_clicks = 0;
    let mut expected_secs = 0;

    for round in 0..6 {
        c.toggle_counting();
        let counting = c.session().is_counting();
        for _ in 0..round {
            c.on_notification();
            c.on_tick();
            if counting {
                expected_clicks += 1;
                expected_secs += 1;
            }
        }
    }

    assert_eq!(c.session().click_count(), expected_clicks);
    assert_eq!(c.session().elapsed_seconds(), expected_secs);
}
