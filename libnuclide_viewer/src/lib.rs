//! # nuclide_viewer
//!
//! nuclide_viewer is a viewer for radionuclide activity time series stored in HDF5 files,
//! written in Rust. Files are uploaded into a session, a table key and a set of
//! radionuclides are selected, and the activity of each radionuclide is plotted against
//! time. Two files can be compared at once: the primary file is drawn as lines, the
//! secondary file as crosses in the same colours. The current chart can be exported as a
//! PNG.
//!
//! ## Installation
//!
//! The only method of install is from source, which is laid out below.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### HDF5
//!
//! Before building and running nuclide_viewer, HDF5 must be installed. Typically this will
//! be installed using a package manager (homebrew, apt, etc), and the Rust libraries will
//! auto detect the location of the HDF install. If that fails, write the following snippet
//! into the file `.cargo/config.toml` in the nuclide_viewer repository:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! Replace `/path/to/my/hdf5/install/` with the path to your HDF5 installation.
//!
//! ### Building & Install
//!
//! To build and install the GUI use `cargo install --path ./nuclide_viewer` from the
//! top level repository. The CLI is installed with `cargo install --path ./nuclide_viewer_cli`.
//!
//! ## Configuration
//!
//! A configuration file saved using the UI is compatible with the CLI and vice-versa. The
//! YAML format of a configuration file is as follows:
//!
//! ```yml
//! files:
//! - /data/case_a.h5
//! - /data/case_b.h5
//! primary_file: case_a.h5
//! secondary_file: case_b.h5
//! table_key: OutflowGeosphere
//! series:
//! - Cs-137
//! - I-129
//! x_axis:
//!   scale: log
//!   min: 1000.0
//!   max: 100000.0
//! y_axis:
//!   scale: log
//!   min: 1.0
//!   max: 100000000.0
//! threshold: null
//! export_width: 800
//! export_height: 600
//! export_path: figure.png
//! max_upload_bytes: 268435456
//! ```
//!
//! Files are referred to by file name once uploaded; uploading a second file with the
//! same name replaces the first. Any field left out takes the value shown above (apart
//! from the file lists, which default to empty).
//!
//! ## Input Data Format
//!
//! ```text
//! case_a.h5
//! time(dset)                  - time axis in years, shared by every table
//! OutflowGeosphere
//! |---- <radionuclide>(dset)  - the list of selectable radionuclides
//! <table key>
//! |---- time(dset)            - optional, overrides the top level time
//! |---- <radionuclide>(dset)  - 1-D values, or 2-D with the value in column 1
//! ```
//!
//! Every top level group is offered as a table key.
//!
//! ## Output
//!
//! Exported images are PNG files named `figure.png` by default. Both applications also
//! write a log; the GUI writes `nuclide_viewer.log` next to where it was launched.
pub mod chart;
pub mod config;
pub mod constants;
pub mod container;
pub mod error;
pub mod export;
pub mod graph;
pub mod hdf_reader;
pub mod selection;
pub mod session;
pub mod upload;
