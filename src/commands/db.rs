use super::{report_warnings, Context};
use crate::output::UserOutput;
use devstack::ServiceManager;

pub async fn run_db_up(
    ctx: &Context,
    services: &[String],
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let compose = ctx.compose().await?;
    let manager = ServiceManager::new(&ctx.runner, &compose, ctx.settings.readiness.poll_policy());
    out.status("Starting database services...");
    let warnings = manager.up_and_wait(services).await?;
    report_warnings(&warnings, out);
    out.success("Database services started");
    Ok(())
}

pub async fn run_db_down(
    ctx: &Context,
    services: &[String],
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let compose = ctx.compose().await?;
    let manager = ServiceManager::new(&ctx.runner, &compose, ctx.settings.readiness.poll_policy());
    manager.down(services).await?;
    out.success("Database services stopped");
    Ok(())
}

pub async fn run_db_reset(
    ctx: &Context,
    services: &[String],
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let compose = ctx.compose().await?;
    let manager = ServiceManager::new(&ctx.runner, &compose, ctx.settings.readiness.poll_policy());
    out.warning("Resetting database services: all data in their volumes will be deleted");
    let warnings = manager.reset(services, &ctx.migrator()).await?;
    report_warnings(&warnings, out);
    out.success("Database services reset");
    Ok(())
}

pub async fn run_migrate(ctx: &Context, out: &dyn UserOutput) -> anyhow::Result<()> {
    out.status("Running database migrations...");
    ctx.migrator().migrate().await?;
    out.success("Migrations applied");
    Ok(())
}

pub async fn run_prepare_offline_queries(
    ctx: &Context,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    out.status("Preparing offline query metadata...");
    ctx.migrator().prepare_offline_queries().await?;
    out.success("Offline query metadata updated");
    Ok(())
}

pub async fn run_stack_up(ctx: &Context, out: &dyn UserOutput) -> anyhow::Result<()> {
    let compose = ctx.compose().await?;
    ServiceManager::new(&ctx.runner, &compose, ctx.settings.readiness.poll_policy())
        .stack_up()
        .await?;
    out.success(&format!("Stack '{}' is up", compose.project()));
    Ok(())
}

pub async fn run_stack_down(ctx: &Context, out: &dyn UserOutput) -> anyhow::Result<()> {
    let compose = ctx.compose().await?;
    ServiceManager::new(&ctx.runner, &compose, ctx.settings.readiness.poll_policy())
        .stack_down()
        .await?;
    out.success(&format!("Stack '{}' is down", compose.project()));
    Ok(())
}
