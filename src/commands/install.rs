use super::{report_warnings, Context};
use crate::output::UserOutput;
use devstack::Registry;

pub async fn run_install_cluster_runtime(
    ctx: &Context,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    out.status("Installing cluster tooling...");
    let report = ctx.bootstrap().reconcile(&Registry::cluster(), false).await?;

    for done in &report.remediated {
        out.success(&format!("Installed {}", done.dependency));
    }
    report_warnings(&report.warnings, out);
    if report.requires_relogin {
        out.warning(
            "Your user was added to the 'docker' group. Log out and back in (or run `newgrp docker`) before starting the cluster.",
        );
    }
    out.success("Cluster tooling ready");
    Ok(())
}
