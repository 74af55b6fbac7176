use std::fmt;

use super::chart::{build_chart, AxisConfig, ChartDescription, ChartRequest, ChartSource, FileSlot};
use super::constants::OUTFLOW_GROUP_NAME;
use super::container::{Container, ContainerDecoder};
use super::error::SelectionError;
use super::upload::{UploadStore, UploadedFile};

/// The nodes of the selection graph. The first eight are written by the user, the rest
/// are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Uploads,
    PrimaryFile,
    SecondaryFile,
    TableKey,
    Series,
    XAxis,
    YAxis,
    Threshold,
    FileOptions,
    TableKeyOptions,
    SeriesOptions,
    Chart,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Every node with the nodes it reads from
pub const NODE_DECLARATIONS: &[(NodeId, &[NodeId])] = &[
    (NodeId::Uploads, &[]),
    (NodeId::PrimaryFile, &[]),
    (NodeId::SecondaryFile, &[]),
    (NodeId::TableKey, &[]),
    (NodeId::Series, &[]),
    (NodeId::XAxis, &[]),
    (NodeId::YAxis, &[]),
    (NodeId::Threshold, &[]),
    (NodeId::FileOptions, &[NodeId::Uploads]),
    (
        NodeId::TableKeyOptions,
        &[NodeId::Uploads, NodeId::PrimaryFile],
    ),
    (
        NodeId::SeriesOptions,
        &[NodeId::Uploads, NodeId::PrimaryFile, NodeId::SecondaryFile],
    ),
    (
        NodeId::Chart,
        &[
            NodeId::Uploads,
            NodeId::PrimaryFile,
            NodeId::SecondaryFile,
            NodeId::TableKey,
            NodeId::Series,
            NodeId::XAxis,
            NodeId::YAxis,
            NodeId::Threshold,
        ],
    ),
];

/// A user event. Several inputs applied together form one update batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Upload(Vec<UploadedFile>),
    SelectPrimaryFile(Option<String>),
    SelectSecondaryFile(Option<String>),
    SelectTableKey(Option<String>),
    SelectSeries(Vec<String>),
    SetXAxis(AxisConfig),
    SetYAxis(AxisConfig),
    SetThreshold(Option<f64>),
}

impl Input {
    pub fn node(&self) -> NodeId {
        match self {
            Input::Upload(_) => NodeId::Uploads,
            Input::SelectPrimaryFile(_) => NodeId::PrimaryFile,
            Input::SelectSecondaryFile(_) => NodeId::SecondaryFile,
            Input::SelectTableKey(_) => NodeId::TableKey,
            Input::SelectSeries(_) => NodeId::Series,
            Input::SetXAxis(_) => NodeId::XAxis,
            Input::SetYAxis(_) => NodeId::YAxis,
            Input::SetThreshold(_) => NodeId::Threshold,
        }
    }
}

/// Current value of every node
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    pub primary_file: Option<String>,
    pub secondary_file: Option<String>,
    pub table_key: Option<String>,
    pub series: Vec<String>,
    pub x_axis: AxisConfig,
    pub y_axis: AxisConfig,
    pub threshold: Option<f64>,
    pub file_options: Vec<String>,
    pub table_key_options: Vec<String>,
    pub series_options: Vec<String>,
    pub chart: ChartDescription,
    /// Why the chart is empty, when it failed to build
    pub chart_warning: Option<String>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            primary_file: None,
            secondary_file: None,
            table_key: None,
            series: vec![],
            x_axis: AxisConfig::default_x(),
            y_axis: AxisConfig::default_y(),
            threshold: None,
            file_options: vec![],
            table_key_options: vec![],
            series_options: vec![],
            chart: ChartDescription::empty(),
            chart_warning: None,
        }
    }
}

/// Blank strings from a cleared dropdown mean "nothing selected"
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Keep the first occurrence of every name, in order
fn dedup_ordered(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

impl SelectionState {
    /// Write a user selection. Returns whether the node value changed.
    ///
    /// Uploads are not handled here; they go to the store.
    pub(crate) fn write_input(&mut self, input: Input) -> bool {
        match input {
            Input::Upload(_) => false,
            Input::SelectPrimaryFile(name) => replace(&mut self.primary_file, non_blank(name)),
            Input::SelectSecondaryFile(name) => {
                replace(&mut self.secondary_file, non_blank(name))
            }
            Input::SelectTableKey(key) => replace(&mut self.table_key, non_blank(key)),
            Input::SelectSeries(series) => replace(&mut self.series, dedup_ordered(series)),
            Input::SetXAxis(axis) => replace(&mut self.x_axis, axis),
            Input::SetYAxis(axis) => replace(&mut self.y_axis, axis),
            Input::SetThreshold(limit) => {
                replace(&mut self.threshold, limit.filter(|v| v.is_finite()))
            }
        }
    }

    /// Recompute a derived node from its upstream values. Returns whether it changed.
    pub(crate) fn recompute(
        &mut self,
        node: NodeId,
        store: &UploadStore,
        decoder: &dyn ContainerDecoder,
    ) -> bool {
        match node {
            NodeId::FileOptions => replace(&mut self.file_options, store.names()),
            NodeId::TableKeyOptions => {
                let options = open_file(store, decoder, self.primary_file.as_deref())
                    .map(|container| match container.list_groups() {
                        Ok(groups) => groups,
                        Err(e) => {
                            spdlog::error!("Could not list table keys: {}", e);
                            vec![]
                        }
                    })
                    .unwrap_or_default();
                replace(&mut self.table_key_options, options)
            }
            NodeId::SeriesOptions => {
                let options = self.series_source(store, decoder).map(|container| {
                    if !container.has_group(OUTFLOW_GROUP_NAME) {
                        spdlog::warn!("Selected file has no {} group", OUTFLOW_GROUP_NAME);
                        return vec![];
                    }
                    match container.list_entries(OUTFLOW_GROUP_NAME) {
                        Ok(entries) => entries,
                        Err(e) => {
                            spdlog::error!("Could not list series: {}", e);
                            vec![]
                        }
                    }
                });
                replace(&mut self.series_options, options.unwrap_or_default())
            }
            NodeId::Chart => {
                let (chart, warning) = self.build_chart(store, decoder);
                let changed_warning = replace(&mut self.chart_warning, warning);
                replace(&mut self.chart, chart) || changed_warning
            }
            input => {
                spdlog::error!("Input node {} has nothing to recompute", input);
                false
            }
        }
    }

    /// The file the series list is read from: primary if it resolves, else secondary
    fn series_source(
        &self,
        store: &UploadStore,
        decoder: &dyn ContainerDecoder,
    ) -> Option<Box<dyn Container>> {
        let primary_present = self
            .primary_file
            .as_deref()
            .is_some_and(|name| store.contains(name));
        if primary_present {
            open_file(store, decoder, self.primary_file.as_deref())
        } else {
            open_file(store, decoder, self.secondary_file.as_deref())
        }
    }

    fn build_chart(
        &self,
        store: &UploadStore,
        decoder: &dyn ContainerDecoder,
    ) -> (ChartDescription, Option<String>) {
        let mut opened: Vec<(FileSlot, &str, Box<dyn Container>)> = Vec::new();
        for (slot, name) in [
            (FileSlot::Primary, self.primary_file.as_deref()),
            (FileSlot::Secondary, self.secondary_file.as_deref()),
        ] {
            if let (Some(name), Some(container)) = (name, open_file(store, decoder, name)) {
                opened.push((slot, name, container));
            }
        }

        let request = ChartRequest {
            sources: opened
                .iter()
                .map(|(slot, name, container)| ChartSource {
                    slot: *slot,
                    file_name: name,
                    container: container.as_ref(),
                })
                .collect(),
            table_key: self.table_key.as_deref(),
            series: &self.series,
            x_axis: self.x_axis,
            y_axis: self.y_axis,
            threshold: self.threshold,
        };

        match build_chart(&request) {
            Ok(chart) => (chart, None),
            Err(e) => {
                spdlog::error!("{}", e);
                (ChartDescription::empty(), Some(e.to_string()))
            }
        }
    }
}

/// Resolve a selected name through the store and decode it.
///
/// Stale names and undecodable payloads are logged and read as "no file".
fn open_file(
    store: &UploadStore,
    decoder: &dyn ContainerDecoder,
    name: Option<&str>,
) -> Option<Box<dyn Container>> {
    let name = name?;
    let payload = match store.get(name) {
        Some(payload) => payload,
        None => {
            spdlog::warn!("{}", SelectionError::StaleFile(name.to_string()));
            return None;
        }
    };
    match decoder.open(&payload) {
        Ok(container) => Some(container),
        Err(e) => {
            spdlog::error!("Failed to decode {}: {}", name, e);
            None
        }
    }
}
