mod support;

use std::fs;
use std::path::Path;

use bevy_ecs::prelude::World;
use chrono::NaiveDate;
use fleet_core::allocation::AllocatorKind;
use fleet_core::clock::ONE_MIN_MS;
use fleet_core::config::SimulationConfig;
use fleet_core::cost::Heuristic;
use fleet_core::error::LoadError;
use fleet_core::fleet::{Fleet, Propulsion, VehicleState};
use fleet_core::graph::{CityGraph, NodeKind, TrafficLevel};
use fleet_core::metrics::FleetMetrics;
use fleet_core::policies::RechargePolicy;
use fleet_core::requests::{RequestBook, RequestId, RequestState};
use fleet_core::routing::RouterKind;
use fleet_core::scenario::{build_from_files, ScenarioFiles, SimulationEndTimeMs};
use fleet_core::systems::traffic::TrafficTimeline;
use support::schedule::ScheduleRunner;
use tempfile::TempDir;

const GRAPH: &str = r#"{
    "directed": false,
    "nodes": [
        { "name": "Centro", "tipo": "LOCAL", "x": 0.0, "y": 0.0, "atratividade": 2 },
        { "name": "Estacao", "x": 8.0, "y": 0.0 },
        { "name": "Bomba", "tipo": "BOMBA_GASOLINA", "x": 4.0, "y": 3.0 },
        { "name": "Hospital", "tipo": 0, "x": 8.0, "y": 6.0 }
    ],
    "edges": [
        { "source": "Centro", "target": "Bomba", "quilometro": 5.0, "velocidadeMaxima": 60.0, "nome": "R1" },
        { "source": "Bomba", "target": "Estacao", "quilometro": 5.0, "velocidadeMaxima": 60.0, "nome": "R2" },
        { "source": "Centro", "target": "Estacao", "quilometro": 8.0, "velocidadeMaxima": 40.0, "nome": "Av", "transito": "elevado" },
        { "source": "Estacao", "target": "Hospital", "quilometro": 6.0, "velocidadeMaxima": 60.0, "nome": "R3" }
    ]
}"#;

const FLEET: &str = r#"{
    "veiculos": [
        { "tipo": "combustao", "id_veiculo": "V1", "autonomia_maxima": 300, "capacidade_passageiros": 4,
          "custo_operacional_km": 0.3, "localizacao_atual": "Centro" },
        { "tipo": "eletrico", "id_veiculo": "V2", "autonomia_maxima": 150, "autonomia_atual": 120,
          "capacidade_passageiros": 3, "custo_operacional_km": 0.1, "localizacao_atual": 3,
          "estado": "em_andamento", "tempo_recarga_km": 1.0 }
    ]
}"#;

const REQUESTS: &str = r#"{
    "pedidos": [
        { "pedido_id": 1, "origem": "Centro", "destino": "Hospital", "passageiros": 2,
          "horario_pretendido": "2025-03-01T08:00:00", "prioridade": 2, "preferencia_ambiental": 1 },
        { "pedido_id": 2, "origem": "Hospital", "destino": "Centro", "passageiros": 1,
          "horario_pretendido": "2025-03-01T08:30:00", "estado": "CANCELADO" },
        { "pedido_id": 3, "origem": 1, "destino": "Centro", "passageiros": 1,
          "horario_pretendido": "2025-03-01 09:00:00", "ride_sharing": true }
    ]
}"#;

const TRAFFIC: &str = r#"{
    "eventos": [
        { "minuto_simulacao": 10, "aresta": "Av", "nivel": "acidente", "duracao_minutos": 30 },
        { "minuto_simulacao": 90, "aresta": "R3", "nivel": "muito_elevado", "descricao": "match day" }
    ]
}"#;

struct Files {
    _dir: TempDir,
    scenario: ScenarioFiles,
}

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write scenario file");
    path
}

fn scenario_files(fleet: &str) -> Files {
    let dir = tempfile::tempdir().expect("temp dir");
    let scenario = ScenarioFiles::new(
        write(dir.path(), "grafo.json", GRAPH),
        write(dir.path(), "veiculos.json", fleet),
        write(dir.path(), "pedidos.json", REQUESTS),
    )
    .with_traffic(write(dir.path(), "transito.json", TRAFFIC));
    Files { _dir: dir, scenario }
}

#[test]
fn scenario_documents_load_into_a_world() {
    let files = scenario_files(FLEET);
    let mut world = World::new();
    build_from_files(&mut world, SimulationConfig::default(), &files.scenario)
        .expect("scenario loads");

    let graph = world.resource::<CityGraph>();
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 8);
    assert_eq!(graph.node_by_name("Bomba").unwrap().kind, NodeKind::FuelStation);
    assert_eq!(graph.node_by_name("Centro").unwrap().attractiveness, 2.0);
    assert_eq!(graph.traffic_level("Av"), Some(TrafficLevel::Heavy));

    let fleet = world.resource::<Fleet>();
    let v2 = fleet.by_label("V2").unwrap();
    assert_eq!(v2.location, "Hospital");
    assert_eq!(v2.state, VehicleState::Available);
    assert_eq!(v2.autonomy_km, 120.0);
    assert_eq!(
        v2.propulsion,
        Propulsion::Electric {
            recharge_minutes_per_km: 1.0
        }
    );

    let book = world.resource::<RequestBook>();
    let first = book.get(RequestId(1)).unwrap();
    assert_eq!(first.desired_at, 0);
    assert_eq!(first.priority, 2);
    assert!(first.eco_preference);
    assert_eq!(book.get(RequestId(2)).unwrap().state, RequestState::Cancelled);
    let third = book.get(RequestId(3)).unwrap();
    assert_eq!(third.origin, "Estacao");
    assert_eq!(third.desired_at, 60 * ONE_MIN_MS);
    assert!(third.ride_sharing);

    let timeline = world.resource::<TrafficTimeline>();
    let changes: Vec<(u64, &str, TrafficLevel)> = timeline
        .iter()
        .map(|change| (change.at, change.edge.as_str(), change.level))
        .collect();
    assert_eq!(
        changes,
        vec![
            (10 * ONE_MIN_MS, "Av", TrafficLevel::Accident),
            (40 * ONE_MIN_MS, "Av", TrafficLevel::Normal),
            (90 * ONE_MIN_MS, "R3", TrafficLevel::VeryHeavy),
        ]
    );
}

#[test]
fn loaded_scenario_runs_to_completion() {
    let files = scenario_files(FLEET);
    let mut world = World::new();
    let config = SimulationConfig::default().with_duration_hours(4.0);
    build_from_files(&mut world, config, &files.scenario).expect("scenario loads");

    ScheduleRunner::new().run_full(&mut world);

    let book = world.resource::<RequestBook>();
    assert_eq!(book.get(RequestId(1)).unwrap().state, RequestState::Completed);
    assert_eq!(book.get(RequestId(2)).unwrap().state, RequestState::Cancelled);
    assert_eq!(book.get(RequestId(3)).unwrap().state, RequestState::Completed);
    let metrics = world.resource::<FleetMetrics>();
    assert_eq!(metrics.accepted(), 2);
    assert_eq!(metrics.completed, 2);
    assert_eq!(metrics.rejected(), 0);
    assert_eq!(world.resource::<CityGraph>().traffic_level("Av"), Some(TrafficLevel::Normal));
    assert_eq!(world.resource::<CityGraph>().traffic_level("R3"), Some(TrafficLevel::VeryHeavy));
}

#[test]
fn explicit_start_shifts_request_times() {
    let files = scenario_files(FLEET);
    let start = NaiveDate::from_ymd_opt(2025, 3, 1)
        .unwrap()
        .and_hms_opt(7, 0, 0)
        .unwrap();
    let scenario = files.scenario.clone().starting_at(start);
    let mut world = World::new();
    build_from_files(&mut world, SimulationConfig::default(), &scenario).expect("scenario loads");

    let book = world.resource::<RequestBook>();
    assert_eq!(book.get(RequestId(1)).unwrap().desired_at, 60 * ONE_MIN_MS);
    assert_eq!(book.get(RequestId(3)).unwrap().desired_at, 120 * ONE_MIN_MS);
}

#[test]
fn bad_documents_fail_the_whole_load() {
    let unknown_location = FLEET.replace(
        "\"localizacao_atual\": \"Centro\"",
        "\"localizacao_atual\": \"Praia\"",
    );
    let files = scenario_files(&unknown_location);
    let err = build_from_files(&mut World::new(), SimulationConfig::default(), &files.scenario)
        .expect_err("unknown start node");
    assert!(matches!(
        err,
        LoadError::UnknownStartLocation { ref vehicle, ref node }
            if vehicle == "V1" && node == "Praia"
    ));

    let unknown_kind = FLEET.replace("\"combustao\"", "\"hidrogenio\"");
    let files = scenario_files(&unknown_kind);
    let err = build_from_files(&mut World::new(), SimulationConfig::default(), &files.scenario)
        .expect_err("unknown vehicle type");
    assert!(matches!(err, LoadError::UnknownVehicleKind(_)));

    let files = scenario_files("{ \"veiculos\": [ ");
    let err = build_from_files(&mut World::new(), SimulationConfig::default(), &files.scenario)
        .expect_err("truncated JSON");
    assert!(matches!(err, LoadError::Json { document: "fleet", .. }));

    let missing = ScenarioFiles::new("/nonexistent/grafo.json", "v.json", "p.json");
    let err = build_from_files(&mut World::new(), SimulationConfig::default(), &missing)
        .expect_err("missing file");
    assert!(matches!(err, LoadError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/grafo.json"));
}

#[test]
fn partial_config_document_keeps_defaults() {
    let config = SimulationConfig::from_json_str(
        r#"{
            "router": "AStar",
            "heuristic": "Euclidean",
            "allocator": { "kind": "cost_based" },
            "recharge": { "kind": "disabled" },
            "duration_hours": 3.0
        }"#,
    )
    .expect("valid config");

    assert_eq!(config.router, RouterKind::AStar);
    assert_eq!(config.heuristic, Heuristic::Euclidean);
    assert_eq!(config.allocator, AllocatorKind::CostBased);
    assert_eq!(config.recharge, RechargePolicy::Disabled);
    assert_eq!(config.rejection_penalty, SimulationConfig::default().rejection_penalty);

    let files = scenario_files(FLEET);
    let mut world = World::new();
    build_from_files(&mut world, config, &files.scenario).expect("scenario loads");
    assert_eq!(world.resource::<SimulationEndTimeMs>().0, 3 * 60 * ONE_MIN_MS);
}

#[test]
fn bundled_demo_data_set_runs() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/demo");
    let scenario = ScenarioFiles::new(
        dir.join("grafo.json"),
        dir.join("veiculos.json"),
        dir.join("pedidos.json"),
    )
    .with_traffic(dir.join("transito.json"));
    let raw_config = fs::read_to_string(dir.join("config.json")).expect("config");
    let config = SimulationConfig::from_json_str(&raw_config).expect("valid config");
    let mut world = World::new();
    build_from_files(&mut world, config, &scenario).expect("demo data loads");
    assert_eq!(world.resource::<Fleet>().len(), 3);
    assert_eq!(world.resource::<RequestBook>().len(), 7);

    ScheduleRunner::new().run_full(&mut world);
    let metrics = world.resource::<FleetMetrics>();
    assert!(metrics.accepted() > 0);
    assert_eq!(metrics.accepted() + metrics.rejected(), 6);
}
