use super::{report_warnings, Context};
use crate::output::UserOutput;
use devstack::config::EnvFileOutcome;
use devstack::{materialize_env, SetupReport};

pub async fn run_setup(ctx: &mut Context, out: &dyn UserOutput) -> anyhow::Result<()> {
    prepare_env(ctx, out)?;
    out.status("Setting up development environment...");
    let report = ctx.bootstrap().setup().await?;
    summarize(&report, out);
    out.success("Development environment ready");
    Ok(())
}

pub async fn run_setup_with_cluster(
    ctx: &mut Context,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    prepare_env(ctx, out)?;
    out.status("Setting up development environment with local cluster...");
    let report = ctx.bootstrap().setup_with_cluster().await?;
    summarize(&report, out);
    out.success("Development environment and cluster ready");
    Ok(())
}

fn prepare_env(ctx: &mut Context, out: &dyn UserOutput) -> anyhow::Result<()> {
    if materialize_env(&ctx.settings)? == EnvFileOutcome::Created {
        out.status(&format!(
            "Created {} from {}",
            ctx.settings.env_file.display(),
            ctx.settings.env_example.display()
        ));
        ctx.reload()?;
    }
    Ok(())
}

fn summarize(report: &SetupReport, out: &dyn UserOutput) {
    for done in &report.remediated {
        out.status(&format!("  installed {} ({} steps)", done.dependency, done.steps_run));
    }
    report_warnings(&report.warnings, out);
    if report.requires_relogin {
        out.warning(
            "Group membership changed: log out and back in (or run `newgrp docker`) so docker works without sudo.",
        );
    }
}
