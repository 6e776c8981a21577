use pretty_assertions::assert_eq;
use shapefile::{Point, Polyline, Shape};
use shapefile_organizer::config::PipelineConfig;
use shapefile_organizer::models::{AttributeValue, Column, DiagnosticKind, Feature, Layer, Stage};
use shapefile_organizer::processors::{FolderMerger, Pipeline};
use shapefile_organizer::readers::{AttributeRow, LayerReader};
use shapefile_organizer::writers::{write_table, GeoPackageWriter, ShapefileWriter};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

const NAD27: &str = "GEOGCS[\"GCS_North_American_1927\",DATUM[\"D_North_American_1927\",SPHEROID[\"Clarke_1866\",6378206.4,294.9786982]],PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]]";

fn text(s: &str) -> AttributeValue {
    AttributeValue::Text(s.to_string())
}

fn write_wells(path: &Path) {
    let mut layer = Layer::new("well001_s").with_crs(Some(NAD27.to_string()));
    layer.add_column(Column::text("API", 10));
    layer.add_column(Column::number("SYMNUM", 4, 0));
    for (api, code, x) in [("00100001", 4.0, -97.1), ("00100002", 155.0, -97.2)] {
        layer.push_feature(
            Feature::new(Shape::Point(Point::new(x, 31.5)))
                .with_attribute("API", text(api))
                .with_attribute("SYMNUM", AttributeValue::Number(code)),
        );
    }
    ShapefileWriter::new().write(&layer, path).unwrap();
}

fn write_road(path: &Path) {
    let mut layer = Layer::new("road01l").with_crs(Some(NAD27.to_string()));
    layer.add_column(Column::text("NAME", 12));
    layer.push_feature(
        Feature::new(Shape::Polyline(Polyline::new(vec![
            Point::new(-97.0, 31.0),
            Point::new(-96.5, 31.4),
        ])))
        .with_attribute("NAME", text("FM 1960")),
    );
    ShapefileWriter::new().write(&layer, path).unwrap();
}

/// Zip every file of a directory (flat) into `archive`.
fn zip_dir(dir: &Path, archive: &Path) {
    let mut zip = ZipWriter::new(File::create(archive).unwrap());
    let mut entries: Vec<PathBuf> = fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect();
    entries.sort();
    for entry in entries {
        let name = entry.file_name().unwrap().to_string_lossy().into_owned();
        zip.start_file(name, FileOptions::default()).unwrap();
        zip.write_all(&fs::read(&entry).unwrap()).unwrap();
    }
    zip.finish().unwrap();
}

/// A dataset drop: loose well files, the roads zipped, and one attribute table.
fn create_drop(temp: &TempDir) -> PathBuf {
    let root = temp.path().join("TRRC_drop");
    fs::create_dir(&root).unwrap();

    write_wells(&root.join("well001_s.shp"));

    let staging = temp.path().join("staging");
    fs::create_dir(&staging).unwrap();
    write_road(&staging.join("road01l.shp"));
    zip_dir(&staging, &root.join("road01.zip"));

    let row = AttributeRow::from([
        ("APINUM".to_string(), text("00100001")),
        ("LEASE".to_string(), text("SMITH UNIT")),
    ]);
    write_table(
        &root.join("api0001.dbf"),
        &[Column::text("APINUM", 10), Column::text("LEASE", 20)],
        &[row],
    )
    .unwrap();

    root
}

#[test]
fn test_end_to_end_scenario() {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let root = create_drop(&temp);

    let run = Pipeline::default().with_quiet(true).run(&root).unwrap();

    // classification
    let shl = root.join("Wells/SHLpts");
    for ext in ["shp", "shx", "dbf", "prj"] {
        assert!(shl.join(format!("well001_s.{}", ext)).exists(), "missing .{}", ext);
    }
    assert!(!root.join("well001_s.shp").exists());
    assert!(root.join("Roads/ln/road01l.shp").exists());
    assert!(root.join("api0001.dbf").exists());

    let classify = run.stage(Stage::Classify).unwrap();
    assert_eq!(classify.processed, 2);
    assert_eq!(classify.count(DiagnosticKind::UnknownPrefix), 1);

    // enrichment rewrote the well layer in place
    let wells = LayerReader::new().read(&shl.join("well001_s.shp")).unwrap();
    assert_eq!(wells.len(), 2);
    assert_eq!(wells.features()[0].get("Well_Status"), &text("Oil Well"));
    assert_eq!(
        wells.features()[1].get("Well_Status"),
        &text("Plugged Storage/Brine Mining/Oil/Gas")
    );
    assert_eq!(wells.features()[0].get("LEASE"), &text("SMITH UNIT"));
    assert!(wells.features()[1].get("LEASE").is_null());

    // merge output
    let merged_path = shl.join("MergedFiles/Wells-SHLpts_Merge.shp");
    let merged = LayerReader::new().read(&merged_path).unwrap();
    assert_eq!(merged.len(), 2);
    assert!(merged
        .features()
        .iter()
        .all(|f| f.get("source_file") == &text("well001_s.shp")));
    assert_eq!(merged.crs.as_deref(), Some(NAD27));

    // consolidation
    let container = root.join("TRRC_MergedLayers.gpkg");
    assert_eq!(run.container, Some(container.canonicalize().unwrap().display().to_string()));
    let gpkg = GeoPackageWriter::open(&container).unwrap();
    assert_eq!(
        gpkg.layer_names().unwrap(),
        vec!["Roads_ln".to_string(), "Wells_SHLpts".to_string()]
    );
    assert_eq!(gpkg.feature_count("Wells_SHLpts").unwrap(), 2);
    assert_eq!(gpkg.feature_count("Roads_ln").unwrap(), 1);
}

#[test]
fn test_rerun_keeps_container_consistent() {
    let temp = TempDir::new().unwrap();
    let root = create_drop(&temp);

    Pipeline::default().with_quiet(true).run(&root).unwrap();
    let second = Pipeline::default().with_quiet(true).run(&root).unwrap();

    assert!(!root.join("Wells/SHLpts/MergedFiles/MergedFiles").exists());
    let gpkg = GeoPackageWriter::open(&root.join("TRRC_MergedLayers.gpkg")).unwrap();
    assert_eq!(gpkg.layer_names().unwrap().len(), 2);
    assert_eq!(gpkg.feature_count("Wells_SHLpts").unwrap(), 2);
    assert_eq!(second.stage(Stage::Consolidate).unwrap().processed, 2);
}

#[test]
fn test_consolidation_keeps_foreign_layers() {
    let temp = TempDir::new().unwrap();
    let root = create_drop(&temp);

    let mut county = Layer::new("counties");
    county.add_column(Column::text("NAME", 10));
    county.push_feature(Feature::new(Shape::Point(Point::new(0.0, 0.0))).with_attribute("NAME", text("Harris")));
    {
        let mut gpkg = GeoPackageWriter::open(&root.join("TRRC_MergedLayers.gpkg")).unwrap();
        gpkg.write_layer("Existing_layer", &county).unwrap();
    }

    Pipeline::default().with_quiet(true).run(&root).unwrap();

    let gpkg = GeoPackageWriter::open(&root.join("TRRC_MergedLayers.gpkg")).unwrap();
    let names = gpkg.layer_names().unwrap();
    assert!(names.contains(&"Existing_layer".to_string()));
    assert!(names.contains(&"Wells_SHLpts".to_string()));
    assert_eq!(gpkg.feature_count("Existing_layer").unwrap(), 1);
}

#[test]
fn test_merge_of_disjoint_schemas() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("Surveys/ln");
    fs::create_dir_all(&dir).unwrap();

    let mut a = Layer::new("a");
    a.add_column(Column::text("ABSTRACT", 8));
    a.push_feature(Feature::new(Shape::Point(Point::new(1.0, 1.0))).with_attribute("ABSTRACT", text("A-12")));
    ShapefileWriter::new().write(&a, &dir.join("surv001l.shp")).unwrap();

    let mut b = Layer::new("b");
    b.add_column(Column::number("ACRES", 8, 0));
    for acres in [40.0, 80.0] {
        b.push_feature(Feature::new(Shape::Point(Point::new(2.0, 2.0))).with_attribute("ACRES", AttributeValue::Number(acres)));
    }
    ShapefileWriter::new().write(&b, &dir.join("surv002l.shp")).unwrap();

    let report = FolderMerger::new().merge_tree(temp.path(), None).unwrap();
    assert_eq!(report.processed, 1);

    let merged = LayerReader::new()
        .read(&dir.join("MergedFiles/Surveys-ln_Merge.shp"))
        .unwrap();
    assert_eq!(merged.len(), 3);
    assert!(merged.features()[0].get("ACRES").is_null());
    assert!(merged.features()[1].get("ABSTRACT").is_null());
    assert_eq!(merged.features()[2].get("ACRES"), &AttributeValue::Number(80.0));
}

#[test]
fn test_skip_extract_leaves_archives_alone() {
    let temp = TempDir::new().unwrap();
    let root = create_drop(&temp);
    let config = PipelineConfig {
        expand_archives: false,
        ..PipelineConfig::default()
    };

    let run = Pipeline::new(config).with_quiet(true).run(&root).unwrap();

    assert!(run.stage(Stage::Expand).is_none());
    assert!(!root.join("Roads").exists());
    assert!(root.join("Wells/SHLpts/well001_s.shp").exists());
}
