//! End-to-end tests: in-memory `.docx` packages through the reader, both
//! pipelines, the chapter merge and the on-disk stores.
//!
//! Packages are assembled with `zip` from small XML snippets so every case
//! states exactly which styles, runs and parts it depends on.

use lessongraph_core::ids::{IdGenerator, IdStrategy};
use lessongraph_core::merge::Upserted;
use lessongraph_core::*;
use serde_json::Value;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::tempdir;
use zip::write::FileOptions;

// ============================================================================
// Package helpers
// ============================================================================

const STYLES: &str = r##"<w:styles xmlns:w="w">
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
<w:style w:type="paragraph" w:styleId="T1"><w:name w:val="# Sub Topic - 1"/></w:style>
<w:style w:type="paragraph" w:styleId="T2"><w:name w:val="# Sub Topic - 2"/></w:style>
<w:style w:type="paragraph" w:styleId="B1"><w:name w:val="# Bullet-1"/></w:style>
<w:style w:type="paragraph" w:styleId="Body"><w:name w:val="# Body"/></w:style>
<w:style w:type="paragraph" w:styleId="Meta"><w:name w:val="# Meta Data"/></w:style>
</w:styles>"##;

const RELS: &str = r#"<Relationships xmlns="r">
<Relationship Id="rId5" Target="media/image1.png"/>
<Relationship Id="rId6" Target="media/image2.png"/>
</Relationships>"#;

const PNG_A: &[u8] = b"\x89PNG\r\n\x1a\nfirst";
const PNG_B: &[u8] = b"\x89PNG\r\n\x1a\nsecond";

/// Run text as it appears inside `w:t`, so tag paragraphs like
/// `<question>` stay well-formed XML.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn run(text: &str) -> String {
    format!(r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#, escape(text))
}

fn bold(text: &str) -> String {
    format!(
        r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape(text)
    )
}

fn image(rel_id: &str) -> String {
    format!(r#"<w:r><w:drawing><a:blip r:embed="{rel_id}"/></w:drawing></w:r>"#)
}

fn fraction(num: &str, den: &str) -> String {
    format!(
        "<m:oMath><m:f><m:num><m:r><m:t>{num}</m:t></m:r></m:num>\
         <m:den><m:r><m:t>{den}</m:t></m:r></m:den></m:f></m:oMath>"
    )
}

fn paragraph(style_id: &str, inner: &str) -> String {
    format!(r#"<w:p><w:pPr><w:pStyle w:val="{style_id}"/></w:pPr>{inner}</w:p>"#)
}

fn docx(paragraphs: &[String]) -> Vec<u8> {
    let document = format!(
        r#"<w:document xmlns:w="w" xmlns:r="r" xmlns:a="a" xmlns:m="m"><w:body>{}</w:body></w:document>"#,
        paragraphs.concat()
    );
    let parts: [(&str, &[u8]); 5] = [
        ("word/document.xml", document.as_bytes()),
        ("word/styles.xml", STYLES.as_bytes()),
        ("word/_rels/document.xml.rels", RELS.as_bytes()),
        ("word/media/image1.png", PNG_A),
        ("word/media/image2.png", PNG_B),
    ];
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in parts {
        writer.start_file(name, FileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn concept_document() -> Vec<u8> {
    docx(&[
        paragraph("T1", &run("Simple Machines")),
        paragraph("Body", &format!("{}{}{}", run("A "), bold("lever"), run(" multiplies force."))),
        paragraph("B1", &format!("{}{}", run("Advantage is "), fraction("L", "E"))),
        paragraph("Body", &format!("{}{}{}", image("rId5"), image("rId6"), image("rId5"))),
        paragraph("T2", &run("Pulleys")),
        paragraph("Body", &image("rId6")),
        paragraph("Normal", ""),
    ])
}

fn qa_document() -> Vec<u8> {
    docx(&[
        paragraph("T1", &run("Exercises")),
        paragraph("Meta", &run("<book_exercise><type=1><question>")),
        paragraph("Body", &run("Q1")),
        paragraph("Meta", &run("<answer>")),
        paragraph("Body", &run("A1")),
        paragraph("Meta", &run("<question>")),
        paragraph("Body", &run("Q2")),
        paragraph("Meta", &run("<answer>")),
        paragraph("Body", &format!("{}{}", run("A2 "), image("rId5"))),
    ])
}

fn processor(config: ConversionConfig, images: &Path) -> DocumentProcessor {
    DocumentProcessor::new_cli(images, config, false).unwrap()
}

fn ids(chapter: &str) -> IdGenerator {
    IdGenerator::new(IdStrategy::Deterministic, chapter)
}

// ============================================================================
// Concept pipeline
// ============================================================================

mod concepts {
    use super::*;

    #[test]
    fn document_becomes_a_nested_tree_in_order() {
        let dir = tempdir().unwrap();
        let converted = processor(ConversionConfig::default(), dir.path())
            .convert_concepts(&concept_document(), ids("1"))
            .unwrap();

        let nodes = &converted.records;
        assert_eq!(nodes.len(), 1);
        let machines = &nodes[0];
        assert_eq!(machines.label, "Simple Machines");
        assert_eq!(
            machines.content[0],
            ContentItem::text(ContentType::Body, "A **lever** multiplies force.")
        );
        assert_eq!(
            machines.content[1],
            ContentItem::text(ContentType::Bullet1, "Advantage is $\\frac{L}{E}$")
        );

        let urls: Vec<&str> = machines.content[2..]
            .iter()
            .filter_map(|item| item.url.as_deref())
            .collect();
        assert_eq!(
            urls,
            [
                "/db/images/Simple-Machines-1.png",
                "/db/images/Simple-Machines-2.png",
                "/db/images/Simple-Machines-1.png",
            ]
        );

        // Same bytes as an image already named under the parent: name reused.
        let pulleys = &machines.children[0];
        assert_eq!(pulleys.label, "Pulleys");
        assert_eq!(
            pulleys.content,
            vec![ContentItem::media(ContentType::Image, "/db/images/Simple-Machines-2.png")]
        );

        assert_eq!(converted.images.len(), 2);
        assert!(converted.report.is_clean());
    }

    #[test]
    fn image_index_restarts_for_each_node() {
        let dir = tempdir().unwrap();
        let bytes = docx(&[
            paragraph("T1", &run("Levers")),
            paragraph("Body", &image("rId5")),
            paragraph("T1", &run("Wheels")),
            paragraph("Body", &image("rId6")),
        ]);
        let converted = processor(ConversionConfig::default(), dir.path())
            .convert_concepts(&bytes, ids("2"))
            .unwrap();
        let names: Vec<&str> = converted.images.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, ["Levers-1.png", "Wheels-1.png"]);
    }

    #[test]
    fn content_before_first_heading_fails_the_document() {
        let dir = tempdir().unwrap();
        let bytes = docx(&[paragraph("Body", &run("Orphan")), paragraph("T1", &run("Late"))]);
        let err = processor(ConversionConfig::default(), dir.path())
            .convert_concepts(&bytes, ids("3"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConversionError>(),
            Some(ConversionError::ContentBeforeHeading { .. })
        ));
    }
}

// ============================================================================
// Q&A pipeline
// ============================================================================

mod qa {
    use super::*;

    #[test]
    fn tagged_document_yields_records_with_reset_metadata() {
        let dir = tempdir().unwrap();
        let converted = processor(ConversionConfig::default(), dir.path())
            .convert_qa(&qa_document(), ids("4"))
            .unwrap();

        let records = &converted.records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].exercise_type, ExerciseType::Book);
        assert_eq!(records[0].question_type, QuestionType::VeryShort);
        assert_eq!(records[1].exercise_type, ExerciseType::Extra);
        assert_eq!(records[1].question_type, QuestionType::Short);
        assert_eq!(records[1].difficulty, Difficulty::Medium);
        assert_eq!(
            records[1].answer,
            vec![
                ContentItem::text(ContentType::Body, "A2"),
                ContentItem::media(ContentType::Image, "/db/images/question-2-1.png"),
            ]
        );

        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["exerciseType"], "book");
        assert_eq!(json["questionType"], "very-short");
        assert!(json.get("mcqAnswer").is_none());
    }
}

// ============================================================================
// Stores: merge, idempotence, failure isolation
// ============================================================================

mod stores {
    use super::*;

    fn job(dir: &Path, input: &Path, chapter: &str, store: &str) -> ChapterJob {
        ChapterJob {
            input: input.to_path_buf(),
            chapter_no: ChapterNo::Text(chapter.to_string()),
            subject_id: "science-6".to_string(),
            store_path: dir.join(store),
        }
    }

    #[test]
    fn rerun_produces_identical_store_and_images() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("3.docx");
        std::fs::write(&input, concept_document()).unwrap();
        let images = dir.path().join("images");
        let processor = processor(ConversionConfig::default(), &images);
        let job = job(dir.path(), &input, "3", "concept.json");

        let first = processor
            .process_concepts_file(&job, &mut StepProfiler::new(false))
            .unwrap();
        assert_eq!(first.upserted, Upserted::Inserted { position: 0 });
        assert_eq!(first.images, 2);
        let before = std::fs::read(&job.store_path).unwrap();

        let second = processor
            .process_concepts_file(&job, &mut StepProfiler::new(true))
            .unwrap();
        assert_eq!(second.upserted, Upserted::Replaced { position: 0 });
        assert_eq!(std::fs::read(&job.store_path).unwrap(), before);

        let chapter_images = images.join("3");
        let mut written: Vec<String> = std::fs::read_dir(&chapter_images)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        written.sort();
        assert_eq!(written, ["Simple-Machines-1.png", "Simple-Machines-2.png"]);
        assert_eq!(
            std::fs::read(chapter_images.join("Simple-Machines-1.png")).unwrap(),
            PNG_A
        );

        let store: Value = serde_json::from_slice(&before).unwrap();
        assert_eq!(
            store["chapters"][0]["nodes"][0]["content"][2]["url"],
            "/db/images/3/Simple-Machines-1.png"
        );
    }

    #[test]
    fn upsert_keeps_neighbours_and_unknown_fields() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("qa.json");
        std::fs::write(
            &store_path,
            r#"{"chapters":[
                {"id":"a","subjectId":"science-6","chapterNo":"1","chapterName":"Food","questions":[
                    {"id":"q1","exerciseType":"practice","questionType":"short","legacy":7,
                     "question":[{"type":"highlight-red","text":"Name a cereal","metadata":{"altText":"Rice"}}]}
                ]},
                {"id":"b","subjectId":"science-6","chapterNo":"3","chapterName":"Matter","questions":[],"reviewed":true},
                {"id":"c","subjectId":"science-6","chapterNo":"5","chapterName":"Light","questions":[]}
            ]}"#,
        )
        .unwrap();
        let input = dir.path().join("3.docx");
        std::fs::write(&input, qa_document()).unwrap();

        let outcome = processor(ConversionConfig::default(), &dir.path().join("images"))
            .process_qa_file(&job(dir.path(), &input, "3", "qa.json"), &mut StepProfiler::new(false))
            .unwrap();
        assert_eq!(outcome.upserted, Upserted::Replaced { position: 1 });
        assert_eq!(outcome.records, 2);

        let store: Value = serde_json::from_slice(&std::fs::read(&store_path).unwrap()).unwrap();
        let chapters = store["chapters"].as_array().unwrap();
        let numbers: Vec<&str> = chapters.iter().map(|c| c["chapterNo"].as_str().unwrap()).collect();
        assert_eq!(numbers, ["1", "3", "5"]);
        assert_eq!(chapters[1]["id"], "b");
        assert_eq!(chapters[1]["chapterName"], "Matter");
        assert_eq!(chapters[1]["reviewed"], true);
        assert_eq!(chapters[1]["questions"].as_array().unwrap().len(), 2);
        assert_eq!(
            chapters[0]["questions"][0],
            serde_json::json!({
                "id": "q1", "exerciseType": "practice", "questionType": "short", "legacy": 7,
                "question": [{"type": "highlight-red", "text": "Name a cereal", "metadata": {"altText": "Rice"}}]
            })
        );
    }

    #[test]
    fn chapters_sharing_an_images_folder_keep_their_own_pictures() {
        let dir = tempdir().unwrap();
        let images = dir.path().join("images");
        let processor = processor(ConversionConfig::default(), &images);
        let question_with = |rel_id: &str| {
            docx(&[
                paragraph("Meta", &run("<question>")),
                paragraph("Body", &image(rel_id)),
                paragraph("Meta", &run("<answer>")),
                paragraph("Body", &run("See figure")),
            ])
        };

        for (chapter, rel_id) in [("1", "rId5"), ("2", "rId6")] {
            let input = dir.path().join(format!("{chapter}.docx"));
            std::fs::write(&input, question_with(rel_id)).unwrap();
            processor
                .process_qa_file(&job(dir.path(), &input, chapter, "qa.json"), &mut StepProfiler::new(false))
                .unwrap();
        }

        let store: Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("qa.json")).unwrap()).unwrap();
        let url = |chapter: usize| store["chapters"][chapter]["questions"][0]["question"][0]["url"].clone();
        assert_eq!(url(0), "/db/images/1/qa/question-1-1.png");
        assert_eq!(url(1), "/db/images/2/qa/question-1-1.png");
        assert_eq!(std::fs::read(images.join("1/qa/question-1-1.png")).unwrap(), PNG_A);
        assert_eq!(std::fs::read(images.join("2/qa/question-1-1.png")).unwrap(), PNG_B);
    }

    #[test]
    fn failed_conversion_leaves_store_and_images_untouched() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("concept.json");
        let original = r#"{"chapters":[{"chapterNo":1,"chapterTitle":"Kept","nodes":[]}]}"#;
        std::fs::write(&store_path, original).unwrap();
        let input = dir.path().join("2.docx");
        std::fs::write(
            &input,
            docx(&[paragraph("Body", &image("rId5")), paragraph("T1", &run("Late"))]),
        )
        .unwrap();
        let images = dir.path().join("images");

        let result = processor(ConversionConfig::default(), &images)
            .process_concepts_file(&job(dir.path(), &input, "2", "concept.json"), &mut StepProfiler::new(false));
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&store_path).unwrap(), original);
        assert_eq!(std::fs::read_dir(&images).unwrap().count(), 0);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("1.docx");
        std::fs::write(&input, concept_document()).unwrap();
        let images = dir.path().join("images");
        let processor = DocumentProcessor::new_cli(&images, ConversionConfig::default(), true).unwrap();

        let outcome = processor
            .process_concepts_file(&job(dir.path(), &input, "1", "concept.json"), &mut StepProfiler::new(false))
            .unwrap();
        assert_eq!(outcome.records, 1);
        assert!(!dir.path().join("concept.json").exists());
        assert!(!images.exists());
    }
}
