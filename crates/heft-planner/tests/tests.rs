use rand::prelude::*;
use rand_pcg::Pcg64;

use heft_planner::cluster::{Cluster, ClusterConfig, VmConfig};
use heft_planner::config::RunConfig;
use heft_planner::cost::CostEstimator;
use heft_planner::error::{LoadError, WorkflowError};
use heft_planner::lower_bound::makespan_lower_bound;
use heft_planner::network::{NetworkConfig, OverheadConfig};
use heft_planner::parsers::config::ParserConfig;
use heft_planner::planner::PlanningAlgorithm;
use heft_planner::report::TaskStatus;
use heft_planner::schedulers::heft::RankTable;
use heft_planner::workflow::Workflow;
use heft_planner::{RunResult, WorkflowSimulation};

const PRECISION: f64 = 1. / ((1 << 20) as f64);
const EPSILON: f64 = 1e-9;

fn assert_float_eq(x: f64, y: f64, eps: f64) {
    assert!(
        (x - y).abs() < eps || (x.max(y) - x.min(y)) / x.min(y) < eps,
        "Values do not match: {:.15} vs {:.15}",
        x,
        y
    );
}

fn assert_float_ge(x: f64, y: f64) {
    assert!(x >= y - PRECISION * y.abs().max(1.), "{:.15} is less than {:.15}", x, y);
}

fn data_path(name: &str) -> String {
    format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn gen_workflow(rng: &mut Pcg64, num_tasks: usize, num_data_items: usize) -> Workflow {
    let mut workflow = Workflow::new();

    for i in 0..num_tasks {
        workflow.add_task(&i.to_string(), rng.gen_range::<u64, _>(1..1_000_000_000) as f64);
    }

    let mut tasks_topsort: Vec<usize> = (0..num_tasks).collect();
    for i in 0..num_tasks {
        tasks_topsort.swap(i, rng.gen_range(0..i + 1));
    }

    for i in 0..num_data_items {
        let num_participants = rng.gen_range(2..4);
        let mut participants: Vec<usize> = Vec::new();
        for _ in 0..num_participants {
            participants.push(rng.gen_range(0..num_tasks));
        }
        participants.sort();
        participants.dedup();
        for task_id in participants.iter_mut() {
            *task_id = tasks_topsort[*task_id];
        }

        let size = rng.gen_range::<u64, _>(1..1_000_000) as f64;

        // rarely generate inputs
        if rng.gen_range(0..100) == 0 {
            let id = workflow.add_data_item(&i.to_string(), size);
            for task in participants.into_iter() {
                workflow.add_data_dependency(id, task).unwrap();
            }
        } else {
            let id = workflow.add_task_output(participants[0], &i.to_string(), size).unwrap();
            for task in participants.into_iter().skip(1) {
                workflow.add_data_dependency(id, task).unwrap();
            }
        }
    }

    workflow
}

fn gen_vms(rng: &mut Pcg64, num_vms: usize) -> Vec<VmConfig> {
    (0..num_vms)
        .map(|i| VmConfig {
            name: i.to_string(),
            speed: rng.gen_range::<u64, _>(1..1_000_000_000) as f64,
        })
        .collect()
}

fn gen_network(rng: &mut Pcg64) -> NetworkConfig {
    NetworkConfig::constant(rng.gen_range(1.0..1_000_000.0), rng.gen_range(0.0..1.0))
}

fn gen_cluster(rng: &mut Pcg64, num_vms: usize) -> Cluster {
    Cluster::new(gen_vms(rng, num_vms), gen_network(rng), OverheadConfig::default()).unwrap()
}

/// Checks precedence and VM exclusivity of the replayed schedule.
fn check_schedule(sim: &WorkflowSimulation, result: &RunResult) {
    let workflow = sim.workflow();
    let estimator = CostEstimator::new(workflow, sim.cluster());
    let trace = &result.trace;
    assert!(trace.is_complete());
    assert_eq!(result.report.failed_count(), 0);

    for task in 0..workflow.task_count() {
        let execution = trace.execution(task).unwrap();
        let planned = result.plan.assignment.get(task).unwrap();
        assert_eq!(execution.vm, planned.vm);
        assert_float_eq(execution.start, planned.start, EPSILON);
        for (pred, data) in workflow.predecessors(task) {
            let pred_execution = trace.execution(pred).unwrap();
            assert_float_ge(
                execution.start,
                pred_execution.finish + estimator.communication_cost(data, pred_execution.vm, execution.vm),
            );
        }
    }

    for vm in 0..sim.cluster().vm_count() {
        let mut intervals = trace
            .executions()
            .filter(|e| e.vm == vm)
            .map(|e| (e.start, e.finish))
            .collect::<Vec<_>>();
        intervals.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        for pair in intervals.windows(2) {
            assert_float_ge(pair[1].0, pair[0].1);
        }
    }

    assert_float_ge(
        result.report.makespan,
        makespan_lower_bound(workflow, sim.cluster()).unwrap(),
    );
}

#[test]
fn random_workflows() {
    let algorithms = ["Heft", "Heft[insertion=true]", "Random[seed=5]"];
    for seed in 0..20 {
        let mut rng = Pcg64::seed_from_u64(seed);
        let num_tasks = rng.gen_range(1..60);
        let workflow = gen_workflow(&mut rng, num_tasks, num_tasks * 2);
        let num_vms = rng.gen_range(1..8);
        let cluster = gen_cluster(&mut rng, num_vms);

        for algorithm in algorithms {
            let mut sim = WorkflowSimulation::new(workflow.clone(), cluster.clone(), algorithm.parse().unwrap());
            let result = sim.run().unwrap();
            check_schedule(&sim, &result);
        }
    }
}

#[test]
fn ranks_of_random_workflows() {
    let mut rng = Pcg64::seed_from_u64(123);
    let workflow = gen_workflow(&mut rng, 100, 300);
    let cluster = gen_cluster(&mut rng, 5);
    let ranks = RankTable::compute(&CostEstimator::new(&workflow, &cluster)).unwrap();

    for task in 0..workflow.task_count() {
        for (succ, _) in workflow.successors(task) {
            assert!(ranks.rank(task) > ranks.rank(succ));
        }
    }
    for pair in ranks.order().windows(2) {
        assert!(ranks.rank(pair[0]) >= ranks.rank(pair[1]));
    }
}

#[test]
fn classic_example() {
    let mut workflow = Workflow::new();

    workflow.add_task("A", 64.);
    workflow.add_task("B", 76.);
    workflow.add_task("C", 52.);
    workflow.add_task("D", 32.);
    workflow.add_task("E", 56.);
    workflow.add_task("F", 64.);
    workflow.add_task("G", 60.);
    workflow.add_task("H", 44.);
    workflow.add_task("I", 48.);
    workflow.add_task("J", 28.);

    let mut add_edge = |from: usize, to: usize, size: f64, name: &str| {
        let id = workflow.add_task_output(from, name, size).unwrap();
        workflow.add_data_dependency(id, to).unwrap();
    };

    add_edge(0, 1, 18., "a");
    add_edge(0, 2, 12., "b");
    add_edge(0, 3, 9., "c");
    add_edge(0, 4, 11., "d");
    add_edge(0, 5, 14., "e");
    add_edge(1, 7, 19., "f");
    add_edge(1, 8, 16., "g");
    add_edge(2, 6, 23., "h");
    add_edge(3, 7, 27., "i");
    add_edge(3, 8, 23., "j");
    add_edge(4, 8, 13., "k");
    add_edge(5, 7, 15., "l");
    add_edge(6, 9, 17., "m");
    add_edge(7, 9, 11., "n");
    add_edge(8, 9, 13., "o");

    let speeds = [1., 2., 4., 4.];
    let vms = speeds
        .iter()
        .enumerate()
        .map(|(i, &speed)| VmConfig {
            name: i.to_string(),
            speed,
        })
        .collect();
    let cluster = Cluster::new(vms, NetworkConfig::constant(1., 0.), OverheadConfig::default()).unwrap();

    let mut sim = WorkflowSimulation::new(workflow, cluster, PlanningAlgorithm::default());
    let result = sim.run().unwrap();
    check_schedule(&sim, &result);

    // 1:                           [-------------E------------]
    // 2:[-------A------][-----C-----][--------B--------][------G------]
    // 3:                              [-------F------][---D--]              [-----I----][----H----][--J--]
    assert_eq!(
        result.plan.ranks.as_ref().unwrap().order(),
        &[0, 2, 1, 5, 4, 3, 6, 8, 7, 9]
    );
    let vms = (0..10)
        .map(|t| result.plan.assignment.get(t).unwrap().vm)
        .collect::<Vec<_>>();
    assert_eq!(vms, vec![2, 2, 2, 3, 1, 3, 2, 3, 3, 3]);
    assert_float_eq(result.report.makespan, 98.0, EPSILON);
    assert_float_eq(result.report.stats.expected_makespan.unwrap(), 98.0, EPSILON);
    assert_eq!(result.report.stats.used_vm_count, 3);
}

#[test]
fn overheads_delay_remote_successors() {
    let mut workflow = Workflow::new();
    let a = workflow.add_task("A", 10.);
    let b = workflow.add_task("B", 10.);
    let c = workflow.add_task("C", 10.);
    workflow.add_dependency(a, b, 0.).unwrap();
    workflow.add_dependency(a, c, 0.).unwrap();

    let config = ClusterConfig::new(
        vec![
            VmConfig {
                name: "0".to_string(),
                speed: 1.,
            },
            VmConfig {
                name: "1".to_string(),
                speed: 1.,
            },
        ],
        NetworkConfig::constant(1., 0.5),
    )
    .with_overheads(OverheadConfig {
        queue_delay: 1.,
        output_transfer_delay: 0.5,
        ..Default::default()
    });

    let mut sim = WorkflowSimulation::from_config(workflow, &config, &RunConfig::default()).unwrap();
    let result = sim.run().unwrap();
    check_schedule(&sim, &result);

    // B follows A on the same VM, C waits for the latency and both overheads on the other one
    let entry = |t| result.plan.assignment.get(t).unwrap().clone();
    assert_eq!((entry(a).vm, entry(b).vm, entry(c).vm), (0, 0, 1));
    assert_float_eq(entry(c).start, 12., EPSILON);
    assert_float_eq(result.report.makespan, 22., EPSILON);
    assert_float_eq(result.report.stats.total_network_time, 2., EPSILON);
}

#[test]
fn random_fleet_is_reproducible() {
    let config = ClusterConfig::random(6, 1000., 42, NetworkConfig::default());
    let first = config.build().unwrap();
    let second = config.build().unwrap();
    assert_eq!(first.vm_count(), 6);
    for (x, y) in first.vms().iter().zip(second.vms()) {
        assert_eq!(x.speed, y.speed);
        assert!(x.speed > 0. && x.speed <= 1000.);
    }
}

#[test]
fn yaml_workflow() {
    let workflow = Workflow::from_file(data_path("diamond.yaml"), &ParserConfig::default()).unwrap();
    assert_eq!(workflow.task_count(), 4);
    assert_eq!(workflow.get_task(0).name, "A");
    assert_eq!(workflow.get_task(1).cost, 200.);
    assert_eq!(workflow.predecessors(3), vec![(1, 8.), (2, 2.)]);
    assert_eq!(workflow.successors(0), vec![(1, 4.), (2, 6.)]);
    assert_eq!(workflow.entry_tasks(), vec![0]);
    assert_eq!(workflow.exit_tasks(), vec![3]);
    assert!(workflow.get_data_item(0).is_input());
    assert_eq!(workflow.depths().unwrap(), vec![0, 1, 1, 2]);
}

#[test]
fn dax_workflow() {
    let workflow = Workflow::from_file(data_path("montage.dax"), &ParserConfig::default()).unwrap();
    assert_eq!(workflow.task_count(), 4);
    assert_eq!(workflow.get_task(0).name, "mProjectPP_ID00000");
    assert_eq!(workflow.get_task(2).name, "mDiffFit_ID00002");
    assert_eq!(workflow.get_task(1).cost, 12000.);
    assert_eq!(workflow.predecessors(2), vec![(0, 4.), (1, 2.)]);

    // the parent link from ID00000 carries no file
    let preds = workflow.predecessors(3);
    assert_eq!(preds.len(), 2);
    assert_eq!(preds[0], (0, 0.));
    assert_eq!(preds[1].0, 2);
    assert_float_eq(preds[1].1, 0.001, EPSILON);

    let config = ParserConfig::with_reference_speed(10.);
    let workflow = Workflow::from_dax(data_path("montage.dax"), &config).unwrap();
    assert_eq!(workflow.get_task(0).cost, 100.);
}

#[test]
fn workflow_from_files_runs() {
    for file in ["diamond.yaml", "montage.dax"] {
        let workflow = Workflow::from_file(data_path(file), &ParserConfig::default()).unwrap();
        let config = ClusterConfig::random(3, 1000., 7, NetworkConfig::default());
        let mut sim = WorkflowSimulation::from_config(workflow, &config, &RunConfig::default()).unwrap();
        let result = sim.run().unwrap();
        check_schedule(&sim, &result);
        assert!(result.report.rows.iter().all(|r| r.status == TaskStatus::Success));
    }
}

#[test]
fn load_errors() {
    assert!(matches!(
        Workflow::from_file(data_path("missing.yaml"), &ParserConfig::default()),
        Err(LoadError::Io { .. })
    ));
    assert!(matches!(
        Workflow::from_file(data_path("workflow.json"), &ParserConfig::default()),
        Err(LoadError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        Workflow::from_yaml_str("tasks:\n  - name: A\n    cost: 1\n    inputs: [nothing]\n"),
        Err(LoadError::Workflow(_))
    ));
    assert!(matches!(
        Workflow::from_yaml_str("tasks:\n  - name: A\n    cost: 1\n  - name: A\n    cost: 2\n"),
        Err(LoadError::Workflow(_))
    ));
    // two producers of one output
    assert!(matches!(
        Workflow::from_yaml_str(
            "
tasks:
  - name: A
    cost: 1
    outputs:
      - name: x
        size: 1
  - name: B
    cost: 1
    outputs:
      - name: x
        size: 2
  - name: C
    cost: 1
    inputs: [x]
"
        ),
        Err(LoadError::Workflow(WorkflowError::DuplicateDataItem(name))) if name == "x"
    ));
    // output reusing a workflow input name
    assert!(matches!(
        Workflow::from_yaml_str(
            "
inputs:
  - name: raw
    size: 1
tasks:
  - name: A
    cost: 1
    inputs: [raw]
    outputs:
      - name: raw
        size: 1
"
        ),
        Err(LoadError::Workflow(WorkflowError::DuplicateDataItem(name))) if name == "raw"
    ));
    assert!(matches!(
        Workflow::from_dax_str(
            r#"<adag>
  <job id="ID1" name="a" runtime="1"><uses file="x" link="output" size="10"/></job>
  <job id="ID2" name="b" runtime="1"><uses file="x" link="output" size="20"/></job>
  <job id="ID3" name="c" runtime="1"><uses file="x" link="input" size="10"/></job>
</adag>"#,
            &ParserConfig::default()
        ),
        Err(LoadError::Workflow(WorkflowError::DuplicateDataItem(name))) if name == "x"
    ));
    assert!(matches!(
        Workflow::from_yaml_str("tasks: 5\n"),
        Err(LoadError::Yaml(_))
    ));
    assert!(matches!(
        Workflow::from_dax_str("<adag><job", &ParserConfig::default()),
        Err(LoadError::Xml(_))
    ));
}

#[test]
fn report_serialization() {
    let workflow = Workflow::from_yaml(data_path("diamond.yaml")).unwrap();
    let cluster = Cluster::new(
        vec![VmConfig {
            name: "single".to_string(),
            speed: 50.,
        }],
        NetworkConfig::default(),
        OverheadConfig::default(),
    )
    .unwrap();
    let result = WorkflowSimulation::new(workflow, cluster, PlanningAlgorithm::default())
        .run()
        .unwrap();

    let json = serde_json::to_value(&result.report).unwrap();
    assert_eq!(json["rows"].as_array().unwrap().len(), 4);
    assert_eq!(json["rows"][0]["status"], "SUCCESS");
    assert_eq!(json["makespan"], 10.);

    let table = result.report.to_table();
    assert_eq!(table.lines().count(), 5);
    assert!(table.lines().nth(4).unwrap().starts_with("3\tD\t1,2,\tSUCCESS\t0\t1.00\t9.00\t10.00\t2"));

    let events = &result.trace.log().events;
    // scheduled, started and completed for every task plus ready for every non-entry task
    assert_eq!(events.len(), 4 * 3 + 3);
}
