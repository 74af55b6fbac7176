use std::sync::Arc;

use super::chart::ChartDescription;
use super::config::ViewerConfig;
use super::container::ContainerDecoder;
use super::error::{ExportError, GraphError, SessionError};
use super::export::{export_png, ImageDownload};
use super::graph::DependencyGraph;
use super::hdf_reader::Hdf5Decoder;
use super::selection::{Input, NodeId, SelectionState, NODE_DECLARATIONS};
use super::upload::UploadStore;

/// What one update batch did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    /// Input nodes whose value changed
    pub changed_inputs: Vec<NodeId>,
    /// Derived nodes recomputed, in evaluation order
    pub recomputed: Vec<NodeId>,
    /// Problems that were recovered from, e.g. rejected uploads
    pub warnings: Vec<String>,
}

/// One user's view of the tool.
///
/// A session owns its uploads and selection state outright; nothing is shared between
/// sessions. Every batch of inputs is applied, then the dependency graph is walked once in
/// topological order.
pub struct Session {
    store: UploadStore,
    decoder: Arc<dyn ContainerDecoder>,
    graph: DependencyGraph<NodeId>,
    state: SelectionState,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session reading uploads with `decoder`
    pub fn new(decoder: Arc<dyn ContainerDecoder>, max_upload_bytes: u64) -> Result<Self, GraphError> {
        let graph = DependencyGraph::new(NODE_DECLARATIONS)?;
        let mut session = Self {
            store: UploadStore::new(max_upload_bytes),
            decoder,
            graph,
            state: SelectionState::default(),
        };
        // Settle every derived node once so the initial state is consistent
        let roots = session.graph.roots();
        session.propagate(roots);
        Ok(session)
    }

    /// Create a session for HDF5 uploads
    pub fn with_hdf5(max_upload_bytes: u64) -> Result<Self, GraphError> {
        Self::new(Arc::new(Hdf5Decoder), max_upload_bytes)
    }

    /// Build a session from a configuration: upload its files, then apply its selection
    /// as a single batch.
    pub fn from_config(
        config: &ViewerConfig,
        decoder: Arc<dyn ContainerDecoder>,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(decoder, config.max_upload_bytes)?;
        let mut inputs = vec![config.upload_input()?];
        inputs.extend(config.selection_inputs());
        let report = session.apply(inputs);
        for warning in report.warnings.iter() {
            spdlog::warn!("{}", warning);
        }
        Ok(session)
    }

    /// Apply a single user input
    pub fn dispatch(&mut self, input: Input) -> UpdateReport {
        self.apply(vec![input])
    }

    /// Apply a batch of simultaneous inputs, then run one update pass
    pub fn apply(&mut self, inputs: Vec<Input>) -> UpdateReport {
        let mut report = UpdateReport::default();
        for input in inputs {
            let node = input.node();
            let changed = match input {
                Input::Upload(files) => {
                    let mut recorded = false;
                    for file in files {
                        match self.store.record(file) {
                            Ok(()) => recorded = true,
                            Err(e) => {
                                spdlog::error!("{}", e);
                                report.warnings.push(e.to_string());
                            }
                        }
                    }
                    recorded
                }
                other => self.state.write_input(other),
            };
            if changed && !report.changed_inputs.contains(&node) {
                report.changed_inputs.push(node);
            }
        }
        report.recomputed = self.propagate(report.changed_inputs.clone());
        spdlog::debug!(
            "Inputs {:?} recomputed {:?}",
            report.changed_inputs,
            report.recomputed
        );
        report
    }

    fn propagate(&mut self, changed: Vec<NodeId>) -> Vec<NodeId> {
        let Self {
            store,
            decoder,
            graph,
            state,
        } = self;
        graph.propagate(changed, |node| {
            state.recompute(node, store, &**decoder)
        })
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    pub fn chart(&self) -> &ChartDescription {
        &self.state.chart
    }

    /// Export the chart as it is right now. Later updates do not affect the result.
    pub fn export(&self, width: u32, height: u32) -> Result<ImageDownload, ExportError> {
        let snapshot = self.state.chart.clone();
        export_png(&snapshot, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{AxisConfig, AxisScale, FileSlot, LineDash, MarkerSymbol, Rgb, SeriesKind, SeriesStyle};
    use crate::container::fixture::{MemoryContainer, MemoryDecoder};
    use crate::upload::UploadedFile;

    fn file_a() -> MemoryContainer {
        MemoryContainer::default()
            .with_vector("time", &[0.0, 1.0, 2.0])
            .with_vector("OutflowGeosphere/Cs-137", &[10.0, 20.0, 30.0])
            .with_vector("OutflowGeosphere/I-129", &[1.0, 2.0, 3.0])
            .with_vector("results/Cs-137", &[10.0, 20.0, 30.0])
            .with_vector("results/I-129", &[1.0, 2.0, 3.0])
    }

    fn file_b() -> MemoryContainer {
        MemoryContainer::default()
            .with_vector("time", &[0.0, 1.0])
            .with_vector("OutflowGeosphere/Sr-90", &[5.0, 6.0])
            .with_vector("summary/Sr-90", &[5.0, 6.0])
    }

    fn session() -> Session {
        let decoder = MemoryDecoder::default()
            .with(b"A", file_a())
            .with(b"B", file_b());
        Session::new(Arc::new(decoder), 1024).unwrap()
    }

    fn upload(session: &mut Session, name: &str, key: &[u8]) -> UpdateReport {
        session.dispatch(Input::Upload(vec![UploadedFile::new(name, key.to_vec())]))
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn initial_state_is_settled_and_empty() {
        let s = session();
        assert!(s.state().file_options.is_empty());
        assert!(s.state().table_key_options.is_empty());
        assert!(s.chart().is_empty());
    }

    #[test]
    fn uploads_feed_both_file_dropdowns() {
        let mut s = session();
        let report = s.dispatch(Input::Upload(vec![
            UploadedFile::new("a.h5", b"A".to_vec()),
            UploadedFile::new("b.h5", b"B".to_vec()),
        ]));
        assert_eq!(s.state().file_options, strings(&["a.h5", "b.h5"]));
        assert_eq!(report.changed_inputs, vec![NodeId::Uploads]);
        assert!(report.recomputed.contains(&NodeId::FileOptions));
    }

    #[test]
    fn table_keys_follow_the_primary_file() {
        let mut s = session();
        upload(&mut s, "a.h5", b"A");
        upload(&mut s, "b.h5", b"B");

        s.dispatch(Input::SelectPrimaryFile(Some(String::from("a.h5"))));
        assert_eq!(
            s.state().table_key_options,
            strings(&["OutflowGeosphere", "results"])
        );

        s.dispatch(Input::SelectPrimaryFile(Some(String::from("b.h5"))));
        assert_eq!(
            s.state().table_key_options,
            strings(&["OutflowGeosphere", "summary"])
        );

        s.dispatch(Input::SelectPrimaryFile(None));
        assert!(s.state().table_key_options.is_empty());
    }

    #[test]
    fn stale_primary_selection_has_no_table_keys() {
        let mut s = session();
        upload(&mut s, "a.h5", b"A");
        s.dispatch(Input::SelectPrimaryFile(Some(String::from("gone.h5"))));
        assert!(s.state().table_key_options.is_empty());
        assert!(s.state().series_options.is_empty());
    }

    #[test]
    fn undecodable_upload_degrades_to_empty_options() {
        let mut s = session();
        upload(&mut s, "junk.h5", b"not a container");
        s.dispatch(Input::SelectPrimaryFile(Some(String::from("junk.h5"))));
        assert!(s.state().table_key_options.is_empty());
        assert!(s.state().series_options.is_empty());
        assert_eq!(s.state().file_options, strings(&["junk.h5"]));
    }

    #[test]
    fn series_options_prefer_primary_and_fall_back_to_secondary() {
        let mut s = session();
        upload(&mut s, "a.h5", b"A");
        upload(&mut s, "b.h5", b"B");

        s.dispatch(Input::SelectSecondaryFile(Some(String::from("b.h5"))));
        assert_eq!(s.state().series_options, strings(&["Sr-90"]));

        s.dispatch(Input::SelectPrimaryFile(Some(String::from("a.h5"))));
        assert_eq!(s.state().series_options, strings(&["Cs-137", "I-129"]));
    }

    #[test]
    fn reupload_refreshes_derived_options() {
        let mut s = session();
        upload(&mut s, "run.h5", b"A");
        s.dispatch(Input::SelectPrimaryFile(Some(String::from("run.h5"))));
        assert_eq!(s.state().series_options, strings(&["Cs-137", "I-129"]));

        upload(&mut s, "run.h5", b"B");
        assert_eq!(s.state().series_options, strings(&["Sr-90"]));
        assert_eq!(s.store().len(), 1);
    }

    #[test]
    fn end_to_end_single_series_line() {
        let mut s = session();
        upload(&mut s, "fileA", b"A");
        s.apply(vec![
            Input::SelectPrimaryFile(Some(String::from("fileA"))),
            Input::SelectTableKey(Some(String::from("results"))),
            Input::SelectSeries(strings(&["Cs-137"])),
            Input::SetXAxis(AxisConfig::new(AxisScale::Linear, 0.0, 2.0)),
        ]);

        let data: Vec<_> = s.chart().data_series().collect();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].x, vec![0.0, 1.0, 2.0]);
        assert_eq!(data[0].y, vec![10.0, 20.0, 30.0]);
        assert!(matches!(data[0].style, SeriesStyle::Line { dash: LineDash::Solid, .. }));
    }

    #[test]
    fn selection_order_drives_colour_order() {
        let mut s = session();
        upload(&mut s, "a.h5", b"A");
        s.apply(vec![
            Input::SelectPrimaryFile(Some(String::from("a.h5"))),
            Input::SelectTableKey(Some(String::from("results"))),
            Input::SelectSeries(strings(&["I-129", "Cs-137"])),
        ]);
        let names: Vec<&str> = s.chart().data_series().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["I-129 (a.h5)", "Cs-137 (a.h5)"]);
        let colours: Vec<Rgb> = s.chart().data_series().map(|d| d.style.color()).collect();
        assert_eq!(colours, vec![Rgb::from_palette(0), Rgb::from_palette(1)]);
    }

    #[test]
    fn same_series_in_both_slots_shares_colour() {
        let mut s = session();
        upload(&mut s, "a.h5", b"A");
        upload(&mut s, "a2.h5", b"A");
        s.apply(vec![
            Input::SelectPrimaryFile(Some(String::from("a.h5"))),
            Input::SelectSecondaryFile(Some(String::from("a2.h5"))),
            Input::SelectTableKey(Some(String::from("results"))),
            Input::SelectSeries(strings(&["Cs-137"])),
        ]);
        let first = s.chart().clone();
        // Plotting again gives the same chart
        s.dispatch(Input::SelectSeries(strings(&["Cs-137"])));
        assert_eq!(s.chart(), &first);

        let data: Vec<_> = first.data_series().collect();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].kind, SeriesKind::Data(FileSlot::Primary));
        assert_eq!(data[1].kind, SeriesKind::Data(FileSlot::Secondary));
        assert_eq!(data[0].style.color(), data[1].style.color());
        assert!(matches!(
            data[1].style,
            SeriesStyle::Markers { symbol: MarkerSymbol::Cross, .. }
        ));
    }

    #[test]
    fn batch_recomputes_each_node_once_in_order() {
        let mut s = session();
        let report = s.apply(vec![
            Input::Upload(vec![UploadedFile::new("a.h5", b"A".to_vec())]),
            Input::SelectPrimaryFile(Some(String::from("a.h5"))),
            Input::SelectTableKey(Some(String::from("results"))),
            Input::SelectSeries(strings(&["Cs-137"])),
        ]);
        for node in [
            NodeId::FileOptions,
            NodeId::TableKeyOptions,
            NodeId::SeriesOptions,
            NodeId::Chart,
        ] {
            assert_eq!(report.recomputed.iter().filter(|n| **n == node).count(), 1);
        }
        assert_eq!(s.state().series_options, strings(&["Cs-137", "I-129"]));
        assert_eq!(s.chart().data_series().count(), 1);
    }

    #[test]
    fn axis_change_only_touches_the_chart() {
        let mut s = session();
        upload(&mut s, "a.h5", b"A");
        let report = s.dispatch(Input::SetYAxis(AxisConfig::new(AxisScale::Linear, 0.0, 50.0)));
        assert_eq!(report.recomputed, vec![NodeId::Chart]);
    }

    #[test]
    fn unchanged_input_recomputes_nothing() {
        let mut s = session();
        let report = s.dispatch(Input::SetXAxis(AxisConfig::default_x()));
        assert!(report.changed_inputs.is_empty());
        assert!(report.recomputed.is_empty());
    }

    #[test]
    fn bad_log_bound_gives_empty_chart_and_warning() {
        let mut s = session();
        upload(&mut s, "a.h5", b"A");
        s.apply(vec![
            Input::SelectPrimaryFile(Some(String::from("a.h5"))),
            Input::SelectTableKey(Some(String::from("results"))),
            Input::SelectSeries(strings(&["Cs-137"])),
            Input::SetYAxis(AxisConfig::new(AxisScale::Log, 0.0, 10.0)),
        ]);
        assert!(s.chart().is_empty());
        assert!(s.state().chart_warning.is_some());

        s.dispatch(Input::SetYAxis(AxisConfig::default_y()));
        assert!(!s.chart().is_empty());
        assert!(s.state().chart_warning.is_none());
    }

    #[test]
    fn rejected_upload_is_reported_not_stored() {
        let mut s = session();
        let report = upload(&mut s, "huge.h5", &[0u8; 2048]);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.changed_inputs.is_empty());
        assert!(s.store().is_empty());
    }

    #[test]
    fn sessions_do_not_share_uploads() {
        let mut first = session();
        let second = session();
        upload(&mut first, "a.h5", b"A");
        assert_eq!(first.store().len(), 1);
        assert!(second.store().is_empty());
        assert!(second.state().file_options.is_empty());
    }

    #[test]
    fn export_snapshots_current_chart() {
        let mut s = session();
        upload(&mut s, "a.h5", b"A");
        s.apply(vec![
            Input::SelectPrimaryFile(Some(String::from("a.h5"))),
            Input::SelectTableKey(Some(String::from("results"))),
            Input::SelectSeries(strings(&["Cs-137"])),
        ]);
        let download = s.export(800, 600).unwrap();
        assert!(!download.bytes.is_empty());
        assert_eq!(download.filename, "figure.png");

        let blank = session().export(800, 600).unwrap();
        assert!(!blank.bytes.is_empty());
    }
}
