//! Probe command implementations.
//!
//! Each command writes its results to the supplied writer, either as aligned
//! text or as JSON. `watch` emits one JSON line per event so its output can
//! be piped while it runs.

use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::Serialize;

use lyre_plugin_abi::PluginId;
use lyre_plugins::{
    PluginInfo, PluginInstaller, PluginRegistry, PositionalData, ProcessInfo, ProcessSource,
    Vector3,
};

use crate::cli::OutputFormat;
use crate::errors::ProbeError;

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

/// Writes the registry's plugins, sorted by name.
pub(crate) fn list_plugins<W: Write>(
    registry: &PluginRegistry,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), ProbeError> {
    let infos: Vec<PluginInfo> = registry
        .plugins(true)
        .iter()
        .map(|plugin| plugin.info())
        .collect();

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &infos)?;
            writeln!(out)?;
        }
        OutputFormat::Human if infos.is_empty() => writeln!(out, "no plugins found")?,
        OutputFormat::Human => {
            for info in &infos {
                writeln!(out, "{}", plugin_line(info))?;
            }
        }
    }
    Ok(())
}

fn plugin_line(info: &PluginInfo) -> String {
    let state = if info.loaded { "loaded" } else { "unloaded" };
    let origin = info.path.as_ref().map_or_else(
        || String::from("built-in"),
        |path| path.display().to_string(),
    );
    format!(
        "{id:>4}  {name:<24} {version:<10} {generation:<7} {state:<9} [{features}] {origin}",
        id = info.id,
        name = info.name,
        version = info.version,
        generation = info.generation,
        features = info.features,
    )
}

// ---------------------------------------------------------------------------
// processes
// ---------------------------------------------------------------------------

/// Writes the process list positional data plugins would be offered.
pub(crate) fn list_processes<W: Write>(
    processes: &dyn ProcessSource,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), ProbeError> {
    let listed: Vec<ProcessInfo> = processes.processes();
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &listed)?;
            writeln!(out)?;
        }
        OutputFormat::Human => {
            for process in &listed {
                writeln!(out, "{:>8}  {}", process.pid(), process.name())?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// watch
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchEvent<'a> {
    Provider {
        tick: u64,
        plugin_id: Option<PluginId>,
        name: Option<String>,
    },
    Pose {
        tick: u64,
        data: &'a PositionalData,
    },
}

/// Tick budget and pacing for [`watch_positional_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WatchSchedule {
    /// Number of ticks to run, unbounded when `None`.
    pub(crate) ticks: Option<u64>,
    /// Pause between ticks.
    pub(crate) interval: Duration,
}

/// Runs positional data ticks on an already scanned registry. Reports the
/// provider whenever it changes and the pose whenever it differs from the
/// last one reported.
pub(crate) fn watch_positional_data<W: Write>(
    registry: &PluginRegistry,
    schedule: WatchSchedule,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), ProbeError> {
    let mut reported_provider: Option<Option<PluginId>> = None;
    let mut reported_pose: Option<PositionalData> = None;
    let mut tick = 0_u64;

    while schedule.ticks.is_none_or(|limit| tick < limit) {
        if tick > 0 {
            thread::sleep(schedule.interval);
        }

        let fresh = registry.fetch_positional_data();
        let provider = registry.active_positional_data_plugin();
        let provider_id = provider.as_ref().map(|plugin| plugin.id());

        if reported_provider != Some(provider_id) {
            let event = WatchEvent::Provider {
                tick,
                plugin_id: provider_id,
                name: provider.as_ref().map(|plugin| plugin.name()),
            };
            emit(&event, format, out)?;
            reported_provider = Some(provider_id);
        }

        if fresh {
            let pose = registry.positional_data();
            if reported_pose.as_ref() != Some(&pose) {
                emit(&WatchEvent::Pose { tick, data: &pose }, format, out)?;
                reported_pose = Some(pose);
            }
        } else {
            reported_pose = None;
        }

        out.flush()?;
        tick = tick.saturating_add(1);
    }
    Ok(())
}

fn emit<W: Write>(
    event: &WatchEvent<'_>,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), ProbeError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, event)?;
            writeln!(out)?;
        }
        OutputFormat::Human => writeln!(out, "{}", describe(event))?,
    }
    Ok(())
}

fn describe(event: &WatchEvent<'_>) -> String {
    match event {
        WatchEvent::Provider {
            tick,
            plugin_id: Some(id),
            name,
        } => format!(
            "tick {tick}: positional data from plugin {id} ({})",
            name.as_deref().unwrap_or_default()
        ),
        WatchEvent::Provider { tick, .. } => {
            format!("tick {tick}: no positional data provider")
        }
        WatchEvent::Pose { tick, data } => format!(
            "tick {tick}: avatar {} camera {} context '{}' identity '{}'",
            vector(data.avatar_position()),
            vector(data.camera_position()),
            data.context(),
            data.identity(),
        ),
    }
}

fn vector(value: Vector3) -> String {
    format!("({:.2}, {:.2}, {:.2})", value.x, value.y, value.z)
}

// ---------------------------------------------------------------------------
// install
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct InstallReport<'a> {
    plugin: &'a PluginInfo,
    installed_to: &'a Path,
}

/// Validates `candidate` and copies it into `directory`.
pub(crate) fn install_plugin<W: Write>(
    directory: &Path,
    candidate: &Path,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), ProbeError> {
    let prepared = PluginInstaller::new(directory).inspect(candidate)?;
    let info = prepared.info().clone();
    let installed_to = prepared.install()?;

    match format {
        OutputFormat::Json => {
            let report = InstallReport {
                plugin: &info,
                installed_to: &installed_to,
            };
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
        OutputFormat::Human => writeln!(
            out,
            "installed {} {} to {}",
            info.name,
            info.version,
            installed_to.display()
        )?,
    }
    Ok(())
}
