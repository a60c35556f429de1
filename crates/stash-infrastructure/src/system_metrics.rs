//! Process metrics from sysinfo
//!
//! Feeds the monitor's `memory_usage` figure: this process's resident
//! memory as a percentage of total system memory. Refreshes run on the
//! blocking pool.

use crate::error_ext::ErrorContext;
use async_trait::async_trait;
use stash_domain::error::{Error, Result};
use stash_domain::ports::infrastructure::{SystemMetrics, SystemMetricsCollector};
use std::sync::{Arc, Mutex};
use sysinfo::{MemoryRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

/// [`SystemMetricsCollector`] backed by a shared `sysinfo::System`
#[derive(Debug, Clone)]
pub struct SysinfoMetricsCollector {
    system: Arc<Mutex<System>>,
    pid: Pid,
}

impl SysinfoMetricsCollector {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        Self {
            system: Arc::new(Mutex::new(system)),
            pid: Pid::from_u32(std::process::id()),
        }
    }
}

impl Default for SysinfoMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn sample(system: &mut System, pid: Pid) -> Result<SystemMetrics> {
    system.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_memory().with_cpu(),
    );

    let process = system
        .process(pid)
        .ok_or_else(|| Error::infrastructure(format!("Process {pid} not found")))?;
    let process_memory_bytes = process.memory();
    let total_memory = system.total_memory();
    let memory_percent = if total_memory > 0 {
        process_memory_bytes as f64 / total_memory as f64 * 100.0
    } else {
        0.0
    };

    Ok(SystemMetrics {
        memory_percent,
        process_memory_bytes,
        cpu_percent: f64::from(process.cpu_usage()),
    })
}

#[async_trait]
impl SystemMetricsCollector for SysinfoMetricsCollector {
    async fn collect(&self) -> Result<SystemMetrics> {
        let system = Arc::clone(&self.system);
        let pid = self.pid;
        tokio::task::spawn_blocking(move || {
            let mut system = system
                .lock()
                .map_err(|_| Error::internal("System metrics lock poisoned"))?;
            sample(&mut system, pid)
        })
        .await
        .context("System metrics task failed")?
    }
}
