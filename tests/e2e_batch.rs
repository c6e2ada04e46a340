//! End-to-end tests for the batch runner.
//!
//! Each test lays out an input folder in a tempdir, runs `BatchRunner::run()`,
//! and inspects the output and dump folders.

use std::path::Path;

use bimids::{BatchRunner, Pipeline, PipelineConfig};

fn document(item: &str, property: &str) -> String {
    format!(
        r#"<Root>
  <System>
    <Name>BIMids</Name>
    <EditionVersion>0.2</EditionVersion>
    <Items>
      <Item><ID>{item}</ID><Name>{item}</Name>
        <Children><Item><ID>{item} child</ID><Name>{item} child</Name></Item></Children>
      </Item>
    </Items>
  </System>
  <PropertyDefinitionGroups>
    <PropertyDefinitionGroup>
      <PropertyDefinitions>
        <PropertyDefinition>
          <Name>{property}</Name>
          <ClassificationIDs><ClassificationID><ItemID>{item}</ItemID></ClassificationID></ClassificationIDs>
        </PropertyDefinition>
      </PropertyDefinitions>
    </PropertyDefinitionGroup>
  </PropertyDefinitionGroups>
</Root>"#
    )
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

// ============================================================================
// 1. Directory input
// ============================================================================

#[test]
fn test_directory_is_processed_in_order() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(input.path(), "walls.xml", &document("Wall", "Thickness"));
    write(input.path(), "doors.xml", &document("Door", "Width"));
    write(input.path(), "readme.txt", "not a document");

    let pipeline = Pipeline::default();
    let out_dir = output.path().join("processed");
    let report = BatchRunner::new(&pipeline, &out_dir).run(input.path()).unwrap();

    assert!(report.is_success());
    assert_eq!(report.processed, vec![out_dir.join("doors_processed.xml"), out_dir.join("walls_processed.xml")]);

    let walls = std::fs::read_to_string(out_dir.join("walls_processed.xml")).unwrap();
    assert!(walls.contains("<ItemID>Wall child</ItemID>"));
}

// ============================================================================
// 2. Failure isolation
// ============================================================================

#[test]
fn test_failing_document_does_not_stop_batch() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(input.path(), "a_broken.xml", "<Root><System></Root>");
    write(input.path(), "b_no_items.xml", "<Root><PropertyDefinitionGroups/></Root>");
    write(input.path(), "c_good.xml", &document("Slab", "Span"));

    let pipeline = Pipeline::default();
    let report = BatchRunner::new(&pipeline, output.path()).run(input.path()).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 2);
    assert!(report.failed[1].1.contains("Items"));
    assert_eq!(report.processed, vec![output.path().join("c_good_processed.xml")]);
}

#[test]
fn test_non_convergence_is_reported_per_document() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(input.path(), "deep.xml", &document("Stair", "Riser height"));

    let config = PipelineConfig::from_json(r#"{ "propagation": { "max_iterations": 1 } }"#).unwrap();
    let pipeline = Pipeline::new(config);
    let report = BatchRunner::new(&pipeline, output.path()).run(input.path()).unwrap();

    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].1.contains("did not converge"));
}

#[test]
fn test_wall_time_budget_is_reported_per_document() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(input.path(), "a_stairs.xml", &document("Stair", "Riser height"));
    write(input.path(), "b_walls.xml", &document("Wall", "Thickness"));

    let config = PipelineConfig::from_json(r#"{ "propagation": { "max_wall_time_ms": 0 } }"#).unwrap();
    let pipeline = Pipeline::new(config);
    let report = BatchRunner::new(&pipeline, output.path()).run(input.path()).unwrap();

    assert_eq!(report.failed.len(), 2);
    assert!(report.failed[0].0.ends_with("a_stairs.xml"));
    assert!(report.failed.iter().all(|(_, message)| message.contains("timed out")));
    assert!(report.processed.is_empty());
}

// ============================================================================
// 3. JSON dumps
// ============================================================================

#[test]
fn test_dump_dir_layout() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let dump = tempfile::tempdir().unwrap();
    let file = input.path().join("walls.xml");
    std::fs::write(&file, document("Wall", "Thickness")).unwrap();

    let pipeline = Pipeline::default();
    let report = BatchRunner::new(&pipeline, output.path())
        .with_dump_dir(dump.path())
        .run(&file)
        .unwrap();
    assert!(report.is_success());

    let read = |rel: &str| -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(dump.path().join(rel)).unwrap()).unwrap()
    };

    let input_json = read("input_json/walls.json");
    assert_eq!(input_json[0]["properties"], serde_json::json!(["Thickness"]));
    assert_eq!(input_json[0]["children"][0]["properties"], serde_json::json!([]));

    let tree = read("element_tree_json/element_tree_walls.json");
    assert_eq!(tree[0]["children"][0]["properties"], serde_json::json!(["Thickness"]));

    let output_json = read("output_json/walls_processed.json");
    assert_eq!(output_json, tree);
}
