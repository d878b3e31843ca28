//! Sources for the monitor's currently active resolution
//!
//! The validator never queries the display itself; callers inject a
//! `DisplayQuery`. `None` means "unknown" and skips the display check.

use anyhow::{Context, Result, bail};
use std::process::Command;
use tracing::{debug, info};
use x11rb::connection::Connection;

use crate::resolution::ResolutionSpec;

pub trait DisplayQuery {
    fn active_resolution(&self) -> Option<ResolutionSpec>;
}

/// Any closure can serve as a fixed or computed source
impl<F> DisplayQuery for F
where
    F: Fn() -> Option<ResolutionSpec>,
{
    fn active_resolution(&self) -> Option<ResolutionSpec> {
        self()
    }
}

/// Query unsupported on this host
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownDisplay;

impl DisplayQuery for UnknownDisplay {
    fn active_resolution(&self) -> Option<ResolutionSpec> {
        None
    }
}

/// Root window size of the default X11 screen
///
/// On multi-monitor setups the root window spans every output, so this only
/// matches native on single-head configurations.
#[derive(Debug, Clone, Copy, Default)]
pub struct X11Display;

impl X11Display {
    fn query() -> Result<ResolutionSpec> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X11")?;
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .with_context(|| format!("X11 screen {screen_num} not found"))?;
        Ok(ResolutionSpec::new(
            screen.width_in_pixels.into(),
            screen.height_in_pixels.into(),
        ))
    }
}

impl DisplayQuery for X11Display {
    fn active_resolution(&self) -> Option<ResolutionSpec> {
        match Self::query() {
            Ok(res) => {
                info!(resolution = %res, "Detected active display resolution");
                Some(res)
            }
            Err(e) => {
                debug!(error = %e, "Active display resolution unavailable");
                None
            }
        }
    }
}

/// Current mode of the video controllers, read through PowerShell's CIM cmdlets
///
/// Several active adapters reporting different modes count as unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsDisplay;

const CIM_QUERY: &str = "Get-CimInstance Win32_VideoController | ForEach-Object { \"$($_.CurrentHorizontalResolution)x$($_.CurrentVerticalResolution)\" }";

impl WindowsDisplay {
    fn query() -> Result<ResolutionSpec> {
        let output = Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", CIM_QUERY])
            .output()
            .context("Failed to run powershell")?;
        if !output.status.success() {
            bail!("powershell exited with {}", output.status);
        }
        parse_video_modes(&String::from_utf8_lossy(&output.stdout))
    }
}

/// One `WIDTHxHEIGHT` per line; inactive adapters print an empty or zero mode
fn parse_video_modes(output: &str) -> Result<ResolutionSpec> {
    let mut modes: Vec<ResolutionSpec> = output
        .lines()
        .filter_map(|line| line.trim().parse::<ResolutionSpec>().ok())
        .filter(ResolutionSpec::is_positive)
        .collect();
    modes.dedup();
    match modes.as_slice() {
        [] => bail!("no active video controller reported a mode"),
        [mode] => Ok(*mode),
        _ => bail!("video controllers disagree on the active mode: {modes:?}"),
    }
}

impl DisplayQuery for WindowsDisplay {
    fn active_resolution(&self) -> Option<ResolutionSpec> {
        match Self::query() {
            Ok(res) => {
                info!(resolution = %res, "Detected active display resolution");
                Some(res)
            }
            Err(e) => {
                debug!(error = %e, "Active display resolution unavailable");
                None
            }
        }
    }
}
