//! End-to-end runs: source → decoder → batcher → pipeline → file sink

use std::io::{Cursor, Write};
use std::num::NonZeroUsize;

use bibline_core::{
    Batcher, JsonLinesDecoder, JsonLinesSink, Outcome, Output, Pipeline, PipelineConfig,
    Rejection, Skip, Source, open_source,
};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct Raw {
    id: u32,
    #[serde(default)]
    year: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct Converted {
    id: String,
    date: String,
}

fn convert(raw: Raw) -> Outcome<Converted> {
    let record = Converted {
        id: format!("ai-0-{}", raw.id),
        date: String::new(),
    };
    if raw.year.len() != 4 {
        return Err(Rejection::skip(record, Skip::new("no date")));
    }
    Ok(Converted {
        date: format!("{}-01-01", raw.year),
        ..record
    })
}

fn input(n: u32) -> String {
    (0..n)
        .map(|i| {
            if i % 5 == 0 {
                format!("{{\"id\":{i}}}\n")
            } else {
                format!("{{\"id\":{i},\"year\":\"{}\"}}\n", 1990 + i % 30)
            }
        })
        .collect()
}

#[test]
fn batch_count_is_ceiling_of_n_over_b() {
    for (n, b) in [(0u32, 3usize), (1, 3), (9, 3), (10, 3), (100, 7)] {
        let decoder: JsonLinesDecoder<_, Raw> =
            JsonLinesDecoder::new(Cursor::new(input(n).into_bytes()));
        let sizes: Vec<usize> = Batcher::new(decoder, convert, NonZeroUsize::new(b).unwrap())
            .map(|batch| batch.unwrap().len())
            .collect();

        let n = n as usize;
        assert_eq!(sizes.len(), n.div_ceil(b), "n={n} b={b}");
        assert_eq!(sizes.iter().sum::<usize>(), n);
        if let Some(last) = sizes.last() {
            let expected = if n % b == 0 { b } else { n % b };
            assert_eq!(*last, expected);
        }
    }
}

#[test]
fn batched_outcomes_match_per_record_conversion() {
    let text = input(23);
    let direct: Vec<Outcome<Converted>> = text
        .lines()
        .map(|line| convert(serde_json::from_str(line).unwrap()))
        .collect();

    let decoder: JsonLinesDecoder<_, Raw> = JsonLinesDecoder::new(Cursor::new(text.into_bytes()));
    let batched: Vec<Outcome<Converted>> =
        Batcher::new(decoder, convert, NonZeroUsize::new(4).unwrap())
            .flat_map(|batch| batch.unwrap().items)
            .collect();

    assert_eq!(batched, direct);
}

#[test]
fn two_runs_produce_identical_output() {
    let dir = TempDir::new().unwrap();
    let source_path = dir.path().join("input.ndj");
    std::fs::write(&source_path, input(250)).unwrap();

    let run = |name: &str| {
        let out_path = dir.path().join(name);
        let opened = open_source(&Source::File(source_path.clone())).unwrap();
        let decoder: JsonLinesDecoder<_, Raw> = JsonLinesDecoder::new(opened.reader);
        let sink = JsonLinesSink::new(Output::create(Some(out_path.as_path())).unwrap());
        let config = PipelineConfig {
            batch_size: NonZeroUsize::new(16).unwrap(),
            channel_capacity: 2,
        };
        let stats = Pipeline::new(config).run(decoder, convert, sink).unwrap();
        (stats, std::fs::read(&out_path).unwrap())
    };

    let (first_stats, first) = run("first.ndj");
    let (second_stats, second) = run("second.ndj");
    assert_eq!(first, second);
    assert_eq!(first_stats.converted, second_stats.converted);
    assert_eq!(first_stats.converted, 200);
    assert_eq!(first_stats.skip_reasons["no date"], 50);
    assert!(!dir.path().join("first.ndj.tmp").exists());
}

#[test]
fn gzip_source_through_pipeline() {
    let dir = TempDir::new().unwrap();
    let source_path = dir.path().join("input.ndj.gz");
    let mut gz = flate2::write::GzEncoder::new(
        std::fs::File::create(&source_path).unwrap(),
        flate2::Compression::default(),
    );
    gz.write_all(input(40).as_bytes()).unwrap();
    gz.finish().unwrap();

    let opened = open_source(&Source::parse(source_path.to_str().unwrap())).unwrap();
    let decoder: JsonLinesDecoder<_, Raw> = JsonLinesDecoder::new(opened.reader);
    let mut out: Vec<Converted> = Vec::new();
    let stats = Pipeline::new(PipelineConfig::default())
        .run(decoder, convert, &mut out)
        .unwrap();

    assert_eq!(stats.seen, 40);
    assert_eq!(out.len(), 32);
    assert_eq!(out[0].id, "ai-0-1");
    assert_eq!(out[0].date, "1991-01-01");
}
