//! Host tuning procedure: NAT for the experiment network, CPU frequency
//! governor, and the network path to an Ethernet-attached SDR.

use tracing::{info, warn};

use crate::config::ProvisionConfig;
use crate::external::{CommandExecutor, Invocation};
use crate::workflows::{Pipeline, ProvisionError, RunReport, Step, StepAction, StepContext};

/// Find the interface carrying `address` in `ip -o -4 addr show` output
pub fn interface_for_address(ip_output: &str, address: &str) -> Option<String> {
    ip_output.lines().find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let inet = fields.iter().position(|f| *f == "inet")?;
        let cidr = fields.get(inet + 1)?;
        let ip = cidr.split('/').next()?;
        if ip == address {
            fields.get(1).map(|name| name.trim_end_matches(':').to_string())
        } else {
            None
        }
    })
}

/// Resolve the SDR-facing interface, querying the host when it isn't configured
pub async fn resolve_sdr_interface(
    config: &ProvisionConfig,
    executor: &dyn CommandExecutor,
) -> Result<Option<String>, ProvisionError> {
    let sdr = &config.tune.sdr;
    if let Some(name) = &sdr.interface {
        return Ok(Some(name.clone()));
    }

    let query = Invocation::new("ip", ["-o", "-4", "addr", "show"]).captured();
    let output = executor
        .execute(&query)
        .await
        .map_err(|source| ProvisionError::Spawn {
            step: "locate sdr interface".to_string(),
            source,
        })?;
    if !output.success() {
        return Err(ProvisionError::StepFailed {
            step: "locate sdr interface".to_string(),
            status: output.status_code,
            detail: output.stderr_tail().map(str::to_string),
        });
    }
    Ok(interface_for_address(&output.stdout_text(), &sdr.address))
}

/// `iptables` NAT rule for `egress`; `op` is `-C` to check or `-A` to append
fn masquerade_rule(op: &str, egress: &str) -> Invocation {
    Invocation::new(
        "iptables",
        ["-t", "nat", op, "POSTROUTING", "-o", egress, "-j", "MASQUERADE"],
    )
}

pub fn plan(config: &ProvisionConfig, sdr_interface: Option<&str>) -> Pipeline {
    let tune = &config.tune;
    let sudo = config.use_sudo;
    let mut pipeline = Pipeline::new("tune");

    if tune.nat.enabled {
        pipeline
            .push(Step::run(
                "enable ip forwarding",
                Invocation::new("sysctl", ["-w", "net.ipv4.ip_forward=1"]).privileged(sudo),
            ))
            .push(Step::new(
                "masquerade egress traffic",
                StepAction::RunUnless {
                    check: masquerade_rule("-C", &tune.nat.egress_interface)
                        .captured()
                        .privileged(sudo),
                    run: masquerade_rule("-A", &tune.nat.egress_interface).privileged(sudo),
                },
            ));
    }

    if tune.cpu.enabled {
        pipeline.push(Step::run(
            "set cpu governor",
            Invocation::new("cpupower", ["frequency-set", "-g", tune.cpu.governor.as_str()])
                .privileged(sudo),
        ));
    }

    if let (true, Some(iface)) = (tune.sdr.enabled, sdr_interface) {
        let mtu = tune.sdr.mtu.to_string();
        let buffers = tune.sdr.socket_buffer_bytes;
        pipeline
            .push(Step::run(
                "raise sdr interface mtu",
                Invocation::new("ip", ["link", "set", "dev", iface, "mtu", mtu.as_str()])
                    .privileged(sudo),
            ))
            .push(Step::run(
                "raise socket receive buffer",
                Invocation::new("sysctl", ["-w".to_string(), format!("net.core.rmem_max={buffers}")])
                    .privileged(sudo),
            ))
            .push(Step::run(
                "raise socket send buffer",
                Invocation::new("sysctl", ["-w".to_string(), format!("net.core.wmem_max={buffers}")])
                    .privileged(sudo),
            ));
    }

    pipeline
}

pub async fn run(config: &ProvisionConfig, ctx: &StepContext) -> Result<RunReport, ProvisionError> {
    let sdr_interface = if config.tune.sdr.enabled {
        let found = resolve_sdr_interface(config, ctx.executor.as_ref()).await?;
        if found.is_none() {
            warn!(
                address = %config.tune.sdr.address,
                "No interface carries the SDR address; skipping SDR tuning"
            );
        }
        found
    } else {
        None
    };

    let pipeline = plan(config, sdr_interface.as_deref());
    if pipeline.steps.is_empty() {
        println!("ℹ️  Nothing to tune; every section is disabled");
        return Ok(RunReport::default());
    }

    info!(steps = pipeline.steps.len(), "Tuning host");
    pipeline.run(ctx).await
}
