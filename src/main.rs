use geom_engine::config::PipelineConfig;
use geom_engine::geometry::MeshQueryIndex;
use geom_engine::node::{
    evaluate, EvaluationStatus, InMemoryMeshSink, NodeCache, NodeKey, TransformMap,
};
use geom_engine::simulation::{ParticleState, SimulationLoop};
use geom_engine_hardware::ExecutionContext;
use geom_engine_profiling::TimingMetrics;
use tracing_subscriber::EnvFilter;

fn main() {
    let mut config = PipelineConfig::load_or_default();
    config.apply_env_overrides();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.logging.with_target)
        .init();

    if let Err(e) = run(&config) {
        tracing::error!("Pipeline failed: {}", e);
        eprintln!("Pipeline failed: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    geom_engine_hardware::print_device_info();

    let ctx = ExecutionContext::for_alias(&config.device)?;
    let mut metrics = TimingMetrics::new();

    // 网格节点
    let mut cache = NodeCache::new();
    let mut sink = InMemoryMeshSink::new();
    let output = evaluate(
        &config.grid.parameters(),
        &NodeKey::from("grid_create"),
        &mut cache,
        &mut sink,
        &TransformMap::new(),
        &ctx,
        config.grid.profiling.then_some(&mut metrics),
    );
    if let EvaluationStatus::Failed(e) = output.status {
        return Err(e.into());
    }

    let published = sink.published().ok_or("grid node published no mesh")?;
    let mesh = published.world_mesh()?;
    let index = MeshQueryIndex::build(&mesh)?;
    tracing::info!(
        "grid mesh: {} points, {} triangles",
        mesh.points().len(),
        mesh.triangle_count()
    );

    // 粒子模拟
    let sim_config = &config.simulation;
    let state = ParticleState::random_cube(
        sim_config.num_particles,
        sim_config.spawn_extent,
        sim_config.seed,
    );
    let mut sim = SimulationLoop::new(&ctx, &index, state, sim_config.force_model, sim_config.dt)?
        .with_host_copy(sim_config.copy_to_host);
    sim.run(sim_config.steps)?;

    tracing::info!("simulated {:.3}s in {} steps", sim.sim_time(), sim.steps_taken());

    for phase in sim.metrics().phases() {
        for &sample in sim.metrics().samples(phase) {
            metrics.record(phase, sample);
        }
    }
    metrics.log_report();
    println!("{}", metrics.summary_json()?);
    Ok(())
}
