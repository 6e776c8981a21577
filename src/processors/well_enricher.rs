use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{DiagnosticKind, Layer, Stage, StageReport};
use crate::processors::attribute_joiner::AttributeJoiner;
use crate::processors::status_decorator::StatusDecorator;
use crate::readers::{AttributeTable, AttributeTableReader, LayerReader};
use crate::utils::constants::ATTRIBUTE_EXTENSION;
use crate::utils::filename::{attribute_table_key, canonical_table_key, is_domain_geometry};
use crate::utils::fs::{list_files_with_extension, walk_sorted};
use crate::utils::ProgressReporter;
use crate::writers::ShapefileWriter;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Root-level attribute tables by lowercased stem, with a second index that ignores
/// leading zeros in the digit run.
#[derive(Debug, Default)]
pub struct AttributeTableIndex {
    exact: HashMap<String, PathBuf>,
    canonical: HashMap<String, PathBuf>,
}

impl AttributeTableIndex {
    /// Index every `<token><digits>.dbf` directly inside `dir`.
    pub fn scan(dir: &Path, token: &str) -> Result<Self> {
        let token = token.to_lowercase();
        let mut index = Self::default();

        for path in list_files_with_extension(dir, ATTRIBUTE_EXTENSION)? {
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_lowercase()) else {
                continue;
            };
            let is_table = stem
                .strip_prefix(&token)
                .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));
            if !is_table {
                continue;
            }
            index
                .canonical
                .entry(canonical_table_key(&stem))
                .or_insert_with(|| path.clone());
            index.exact.insert(stem, path);
        }

        Ok(index)
    }

    pub fn lookup(&self, key: &str) -> Option<&Path> {
        let key = key.to_lowercase();
        self.exact
            .get(&key)
            .or_else(|| self.canonical.get(&canonical_table_key(&key)))
            .map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

/// Adds decoded status labels and external attributes to every well layer, loading
/// and rewriting each file once.
pub struct WellEnricher {
    well_token: String,
    table_token: String,
    key_digits: usize,
    merged_folder_name: String,
    table_key: String,
    decorator: StatusDecorator,
    joiner: AttributeJoiner,
    layer_reader: LayerReader,
    table_reader: AttributeTableReader,
    writer: ShapefileWriter,
}

impl WellEnricher {
    pub fn new() -> Self {
        Self::from_config(&PipelineConfig::default())
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            well_token: config.well_token.clone(),
            table_token: config.table_token.clone(),
            key_digits: config.key_digits,
            merged_folder_name: config.merged_folder_name.clone(),
            table_key: config.table_key_column.clone(),
            decorator: StatusDecorator::from_config(config),
            joiner: AttributeJoiner::from_config(config),
            layer_reader: LayerReader::new(),
            table_reader: AttributeTableReader::new(),
            writer: ShapefileWriter::new(),
        }
    }

    /// Well geometry files anywhere under `root`, outside merge-output folders.
    pub fn find_well_layers(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let layers = walk_sorted(root, Some(self.merged_folder_name.as_str()))?
            .into_iter()
            .filter(|e| {
                e.file_type().is_file()
                    && is_domain_geometry(&e.file_name().to_string_lossy(), &self.well_token)
            })
            .map(|e| e.into_path())
            .collect();
        Ok(layers)
    }

    pub fn enrich_tree(&self, root: &Path, progress: Option<&ProgressReporter>) -> Result<StageReport> {
        let mut report = StageReport::new(Stage::Enrich);
        let tables = AttributeTableIndex::scan(root, &self.table_token)?;
        tracing::info!("Found {} attribute tables in {}", tables.len(), root.display());

        let mut loaded: HashMap<PathBuf, AttributeTable> = HashMap::new();
        for path in self.find_well_layers(root)? {
            if let Some(p) = progress {
                p.set_message(&format!("Enriching {}", path.display()));
            }
            self.enrich_file(&path, &tables, &mut loaded, &mut report);
        }

        Ok(report)
    }

    /// Load one well layer, decorate and join it, and write it back once.
    fn enrich_file(
        &self,
        path: &Path,
        tables: &AttributeTableIndex,
        loaded: &mut HashMap<PathBuf, AttributeTable>,
        report: &mut StageReport,
    ) {
        let mut layer = match self.layer_reader.read(path) {
            Ok(layer) => layer,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", path.display(), e);
                report.record(DiagnosticKind::IoFailure, path, e.to_string());
                return;
            }
        };
        let mut changed = false;

        match self.decorator.decorate(&layer) {
            Ok(decorated) => {
                layer = decorated;
                changed = true;
            }
            Err(e) => {
                tracing::warn!("No status decoding for {}: {}", path.display(), e);
                report.record(DiagnosticKind::SchemaMismatch, path, e.to_string());
            }
        }

        if let Some(joined) = self.join_external(path, &layer, tables, loaded, report) {
            layer = joined;
            changed = true;
        }

        if !changed {
            return;
        }
        match self.writer.write_replacing(&layer, path) {
            Ok(count) => {
                tracing::info!("Enriched {} ({} features)", path.display(), count);
                report.record_success();
            }
            Err(e) => {
                tracing::warn!("Cannot rewrite {}: {}", path.display(), e);
                report.record(DiagnosticKind::IoFailure, path, e.to_string());
            }
        }
    }

    fn join_external(
        &self,
        path: &Path,
        layer: &Layer,
        tables: &AttributeTableIndex,
        loaded: &mut HashMap<PathBuf, AttributeTable>,
        report: &mut StageReport,
    ) -> Option<Layer> {
        let file_name = path.file_name()?.to_string_lossy();
        let key = attribute_table_key(&file_name, &self.table_token, self.key_digits);

        let Some(table_path) = tables.lookup(&key) else {
            tracing::warn!("No attribute table '{}' for {}", key, path.display());
            report.record(DiagnosticKind::JoinKeyMiss, path, format!("no attribute table for key '{}'", key));
            return None;
        };

        if !loaded.contains_key(table_path) {
            match self.table_reader.read(table_path) {
                Ok(table) => {
                    loaded.insert(table_path.to_path_buf(), table);
                }
                Err(e) => {
                    tracing::warn!("Cannot read {}: {}", table_path.display(), e);
                    report.record(DiagnosticKind::IoFailure, table_path, e.to_string());
                    return None;
                }
            }
        }
        let table = loaded.get(table_path)?;

        match self.joiner.join(layer, table) {
            Ok(joined) => {
                tracing::debug!(
                    "Joined {} on {} ({} -> {} rows)",
                    table_path.display(),
                    self.table_key,
                    layer.len(),
                    joined.len()
                );
                Some(joined)
            }
            Err(e) => {
                tracing::warn!("Cannot join {} onto {}: {}", table_path.display(), path.display(), e);
                report.record(DiagnosticKind::SchemaMismatch, path, e.to_string());
                None
            }
        }
    }
}

impl Default for WellEnricher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributeValue, Column, Feature};
    use crate::readers::AttributeRow;
    use crate::writers::write_table;
    use pretty_assertions::assert_eq;
    use shapefile::{Point, Shape};
    use std::fs;
    use tempfile::TempDir;

    fn write_well(path: &Path) -> Result<()> {
        let mut layer = Layer::new("well");
        layer.add_column(Column::text("API", 10));
        layer.add_column(Column::number("SymNum", 4, 0));
        layer.push_feature(
            Feature::new(Shape::Point(Point::new(-97.0, 31.0)))
                .with_attribute("API", AttributeValue::Text("00100001".into()))
                .with_attribute("SymNum", AttributeValue::Number(4.0)),
        );
        ShapefileWriter::new().write(&layer, path)?;
        Ok(())
    }

    #[test]
    fn test_table_index_lookup() -> Result<()> {
        let temp = TempDir::new()?;
        for name in ["api0001.dbf", "API123.DBF", "apixyz.dbf", "road.dbf"] {
            fs::write(temp.path().join(name), b"x")?;
        }

        let index = AttributeTableIndex::scan(temp.path(), "api")?;

        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup("api0001"), Some(temp.path().join("api0001.dbf").as_path()));
        assert_eq!(index.lookup("api001"), Some(temp.path().join("api0001.dbf").as_path()));
        assert_eq!(index.lookup("api123"), Some(temp.path().join("API123.DBF").as_path()));
        assert_eq!(index.lookup("api002"), None);
        Ok(())
    }

    #[test]
    fn test_enrich_tree_decorates_and_joins() -> Result<()> {
        let temp = TempDir::new()?;
        let shl = temp.path().join("Wells/SHLpts");
        fs::create_dir_all(&shl)?;
        let well = shl.join("well001_s.shp");
        write_well(&well)?;

        let row = AttributeRow::from([
            ("APINUM".to_string(), AttributeValue::Text("00100001".into())),
            ("LEASE".to_string(), AttributeValue::Text("SMITH".into())),
        ]);
        write_table(
            &temp.path().join("api0001.dbf"),
            &[Column::text("APINUM", 10), Column::text("LEASE", 10)],
            &[row],
        )?;

        let report = WellEnricher::new().enrich_tree(temp.path(), None)?;

        assert_eq!(report.processed, 1);
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        let layer = LayerReader::new().read(&well)?;
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.features()[0].get("Well_Status"), &AttributeValue::Text("Oil Well".into()));
        assert_eq!(layer.features()[0].get("LEASE"), &AttributeValue::Text("SMITH".into()));
        Ok(())
    }

    #[test]
    fn test_missing_table_still_decorates() -> Result<()> {
        let temp = TempDir::new()?;
        let well = temp.path().join("well002_s.shp");
        write_well(&well)?;

        let report = WellEnricher::new().enrich_tree(temp.path(), None)?;

        assert_eq!(report.count(DiagnosticKind::JoinKeyMiss), 1);
        assert_eq!(report.processed, 1);
        let layer = LayerReader::new().read(&well)?;
        assert!(layer.has_column("Well_Status"));
        Ok(())
    }

    #[test]
    fn test_unreadable_layer_is_reported() -> Result<()> {
        let temp = TempDir::new()?;
        fs::write(temp.path().join("well003_s.shp"), b"broken")?;

        let report = WellEnricher::new().enrich_tree(temp.path(), None)?;

        assert_eq!(report.count(DiagnosticKind::IoFailure), 1);
        assert_eq!(report.processed, 0);
        Ok(())
    }
}
