//! Adapters driven through the pipeline

use std::io::Cursor;

use bibline_core::{Pipeline, PipelineConfig, PipelineError};
use bibline_formats::{CrossrefAdapter, GenderOpenAdapter, GeniosAdapter, SourceAdapter};
use bibline_schema::IntermediateRecord;

fn crossref_lines() -> String {
    let mut lines = String::new();
    for i in 0..30 {
        let line = match i % 10 {
            // No date
            3 => format!(r#"{{"URL": "http://dx.doi.org/10.1/{i}", "title": ["t{i}"]}}"#),
            // No URL
            7 => format!(r#"{{"title": ["t{i}"], "issued": {{"date-parts": [[2019]]}}}}"#),
            // Not JSON
            9 => "{\"URL\": ".to_string(),
            _ => format!(
                r#"{{"URL": "http://dx.doi.org/10.1/{i}", "title": ["t{i}"], "issued": {{"date-parts": [[2019, 2, {}]]}}}}"#,
                i % 28 + 1
            ),
        };
        lines.push_str(&line);
        lines.push('\n');
    }
    lines
}

#[test]
fn crossref_counts() {
    let adapter = CrossrefAdapter::default();
    let decoder = adapter.decoder(Cursor::new(crossref_lines()));
    let mut out: Vec<IntermediateRecord> = Vec::new();
    let stats = Pipeline::new(PipelineConfig::default())
        .run(decoder, |raw| adapter.convert(raw), &mut out)
        .unwrap();

    assert_eq!(stats.seen, 27);
    assert_eq!(stats.converted, 21);
    assert_eq!(stats.skipped, 3);
    assert_eq!(stats.errored, 3);
    assert_eq!(stats.malformed, 3);
    assert_eq!(stats.skip_reasons["no date"], 3);
    assert_eq!(out.len(), 21);
    assert_eq!(out[0].article_title, "t0");
    assert!(out.iter().all(|r| r.id.starts_with("ai-49-")));
}

#[test]
fn crossref_output_is_stable_across_batch_sizes() {
    let adapter = CrossrefAdapter::default();
    let run = |batch_size| {
        let config = PipelineConfig {
            batch_size: std::num::NonZeroUsize::new(batch_size).unwrap(),
            channel_capacity: 1,
        };
        let mut out: Vec<IntermediateRecord> = Vec::new();
        Pipeline::new(config)
            .run(
                adapter.decoder(Cursor::new(crossref_lines())),
                |raw| adapter.convert(raw),
                &mut out,
            )
            .unwrap();
        out
    };
    assert_eq!(run(1), run(7));
    assert_eq!(run(7), run(1000));
}

#[test]
fn genios_documents() {
    let xml = r#"<?xml version="1.0"?>
<Documents>
  <Document ID="1" DB="ZECO"><Source>ZECO</Source><Title>Eins</Title><Year>2001</Year></Document>
  <Document ID="2" DB="ZECO"><Source>ZECO</Source><Title>Zwei</Title></Document>
  <Document ID="3" DB="ZECO"><Source>ZECO</Source><Title>Drei</Title><Date>20030405</Date></Document>
</Documents>"#;
    let adapter = GeniosAdapter::default();
    let mut out: Vec<IntermediateRecord> = Vec::new();
    let stats = Pipeline::new(PipelineConfig::default())
        .run(adapter.decoder(Cursor::new(xml)), |raw| adapter.convert(raw), &mut out)
        .unwrap();
    assert_eq!((stats.seen, stats.converted, stats.skipped), (3, 2, 1));
    assert_eq!(out[1].record_id, "3");
    assert_eq!(out[1].date.unwrap().to_string(), "2003-04-05");
}

#[test]
fn broken_xml_aborts_after_earlier_records() {
    let xml = r#"<Records>
  <Record><header><identifier>oai:x:1</identifier></header>
    <metadata><dc><date>2010</date></dc></metadata></Record>
  <Record><header><identifier>oai:x:2</identifier></header>
    <metadata><dc><date>2011</dc></metadata></Record>
</Records>"#;
    let adapter = GenderOpenAdapter;
    let mut out: Vec<IntermediateRecord> = Vec::new();
    let err = Pipeline::new(PipelineConfig::default())
        .run(adapter.decoder(Cursor::new(xml)), |raw| adapter.convert(raw), &mut out)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Stream { .. }));
    assert_eq!(err.stats().converted, 1);
    assert_eq!(out.len(), 1);
    // base64url of "oai:x:1"
    assert_eq!(out[0].record_id, "b2FpOng6MQ");
}
