use super::Context;
use crate::output::UserOutput;
use devstack::ClusterState;

pub async fn run_start_cluster(ctx: &Context, out: &dyn UserOutput) -> anyhow::Result<()> {
    let cluster = ctx.cluster();
    let policy = cluster.policy();
    out.status(&format!(
        "Starting cluster '{}' (up to {} attempts)...",
        ctx.settings.cluster.profile, policy.max_attempts
    ));
    cluster.start().await?;
    out.success("Cluster running");
    Ok(())
}

pub async fn run_stop_cluster(ctx: &Context, out: &dyn UserOutput) -> anyhow::Result<()> {
    out.status(&format!("Stopping cluster '{}'...", ctx.settings.cluster.profile));
    ctx.cluster().stop().await?;
    out.success("Cluster stopped");
    Ok(())
}

pub async fn run_cluster_status(ctx: &Context, out: &dyn UserOutput) -> anyhow::Result<()> {
    let state = ctx.cluster().status().await;
    let line = format!("Cluster '{}': {}", ctx.settings.cluster.profile, state);
    match state {
        ClusterState::Running => out.success(&line),
        ClusterState::Absent => {
            out.warning(&line);
            out.warning("  Run `devstack install-cluster-runtime` to install minikube");
        }
        _ => out.status(&line),
    }
    Ok(())
}
