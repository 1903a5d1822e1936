use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use env_logger::Builder;

use heft_planner::cluster::ClusterConfig;
use heft_planner::config::RunConfig;
use heft_planner::planner::PlanningAlgorithm;
use heft_planner::workflow::Workflow;
use heft_planner::WorkflowSimulation;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Plans the workflow with HEFT (or a baseline), replays the plan and prints the job table.
struct Args {
    /// Path to workflow file (.yaml or .dax)
    #[arg(short, long)]
    workflow: PathBuf,

    /// Path to system file
    #[arg(short, long)]
    system: PathBuf,

    /// Path to run config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Planning algorithm, e.g. Heft, Heft[insertion=true] or Random[seed=1] (overrides run config)
    #[arg(short, long)]
    algorithm: Option<String>,

    /// Save trace log to this file (overrides run config)
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Save report in JSON to this file
    #[arg(short, long)]
    report: Option<PathBuf>,
}

fn run(args: Args) -> Result<bool, Box<dyn Error>> {
    let mut run_config = match &args.config {
        Some(path) => RunConfig::from_yaml(path)?,
        None => RunConfig::default(),
    };
    if let Some(algorithm) = &args.algorithm {
        run_config.algorithm = algorithm.parse::<PlanningAlgorithm>()?;
    }
    if args.trace.is_some() {
        run_config.trace = args.trace;
    }

    let workflow = Workflow::from_file(&args.workflow, &run_config.parser)?;
    let cluster_config = ClusterConfig::from_yaml(&args.system)?;

    println!("\nWorkflow: {} ({} tasks)", args.workflow.display(), workflow.task_count());
    println!("System: {}", args.system.display());
    println!("Algorithm: {}", run_config.resolved_algorithm());

    let mut sim = WorkflowSimulation::from_config(workflow, &cluster_config, &run_config)?;
    let (result, error) = sim.run_partial()?;

    println!();
    println!("========== OUTPUT ==========");
    print!("{}", result.report.to_table());
    println!();
    let stats = &result.report.stats;
    if let Some(expected) = stats.expected_makespan {
        println!("Expected makespan: {:.2}", expected);
    }
    println!("Makespan: {:.2}", result.report.makespan);
    println!("Makespan lower bound: {:.2}", stats.makespan_lower_bound);
    println!(
        "Used VMs: {}/{}, utilization: {:.2}%",
        stats.used_vm_count,
        sim.cluster().vm_count(),
        stats.vm_utilization * 100.
    );
    println!("Network time: {:.2}", stats.total_network_time);

    if let Some(path) = &run_config.trace {
        result.trace.log().save_to_file(&path.to_string_lossy())?;
    }
    if let Some(path) = &args.report {
        File::create(path)?.write_all(serde_json::to_string_pretty(&result.report)?.as_bytes())?;
    }

    match error {
        Some(err) => {
            eprintln!("The simulation has been terminated: {}", err);
            Ok(false)
        }
        None => Ok(true),
    }
}

fn main() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    match run(Args::parse()) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(2);
        }
    }
}
