//! One-shot loaders for the four JSON input documents.
//!
//! Every loader validates the whole document before returning: a single bad entry fails
//! the load with a [LoadError] and nothing is partially built. Field names follow the
//! documents the data sets are published in (`quilometro`, `veiculos`, `pedidos`, ...);
//! English aliases are accepted where they are unambiguous.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::clock::ONE_MIN_MS;
use crate::error::LoadError;
use crate::fleet::{Fleet, Propulsion, Vehicle, VehicleId, VehicleState};
use crate::graph::{CityGraph, EdgeSpec, NodeId, NodeKind, NodeSpec, TrafficLevel};
use crate::requests::{Request, RequestBook, RequestId, RequestState};
use crate::systems::traffic::{TrafficChange, TrafficTimeline};

/// Recharge minutes per km assumed for electric vehicles that do not state one.
const DEFAULT_RECHARGE_MINUTES_PER_KM: f64 = 2.0;

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: DeserializeOwned>(raw: &str, document: &'static str) -> Result<T, LoadError> {
    serde_json::from_str(raw).map_err(|source| LoadError::Json { document, source })
}

fn require_positive(
    entity: &'static str,
    id: &str,
    field: &'static str,
    value: f64,
) -> Result<(), LoadError> {
    if value > 0.0 && value.is_finite() {
        return Ok(());
    }
    Err(LoadError::InvalidField {
        entity,
        id: id.to_string(),
        field,
        expected: "a positive number",
        value,
    })
}

fn require_non_negative(
    entity: &'static str,
    id: &str,
    field: &'static str,
    value: f64,
) -> Result<(), LoadError> {
    if value >= 0.0 && value.is_finite() {
        return Ok(());
    }
    Err(LoadError::InvalidField {
        entity,
        id: id.to_string(),
        field,
        expected: "non-negative",
        value,
    })
}

/// A node reference written either as its name or as its declaration index.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NodeRef {
    Index(u32),
    Name(String),
}

impl NodeRef {
    fn resolve(&self, graph: &CityGraph) -> Option<String> {
        match self {
            NodeRef::Index(index) => graph.node(NodeId(*index)).map(|node| node.name.clone()),
            NodeRef::Name(name) => graph.node_by_name(name).map(|node| node.name.clone()),
        }
    }

    fn display(&self) -> String {
        match self {
            NodeRef::Index(index) => index.to_string(),
            NodeRef::Name(name) => name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    directed: bool,
    nodes: Vec<NodeEntry>,
    #[serde(default)]
    edges: Vec<EdgeEntry>,
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    name: Value,
    #[serde(default, alias = "type")]
    tipo: Option<Value>,
    x: Option<f64>,
    y: Option<f64>,
    #[serde(default, alias = "attractiveness")]
    atratividade: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EdgeEntry {
    source: Value,
    target: Value,
    #[serde(alias = "distance_km")]
    quilometro: f64,
    #[serde(rename = "velocidadeMaxima", alias = "speed_kmh")]
    velocidade_maxima: f64,
    #[serde(alias = "name")]
    nome: String,
    #[serde(default, alias = "traffic")]
    transito: Option<Value>,
}

/// Node names may be written as strings or bare numbers.
fn value_to_name(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn parse_node_kind(value: Option<&Value>) -> Result<NodeKind, LoadError> {
    let Some(value) = value else {
        return Ok(NodeKind::Location);
    };
    let kind = match value {
        Value::Number(number) => match number.as_u64() {
            Some(0) => Some(NodeKind::Location),
            Some(1) => Some(NodeKind::FuelStation),
            Some(2) => Some(NodeKind::ChargingStation),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "local" | "location" | "plain" => Some(NodeKind::Location),
            "bomba_gasolina" | "fuel_station" | "fuel" => Some(NodeKind::FuelStation),
            "posto_carregamento" | "charging_station" | "charging" => Some(NodeKind::ChargingStation),
            _ => None,
        },
        _ => None,
    };
    kind.ok_or_else(|| LoadError::UnknownNodeKind(value_to_name(value)))
}

fn parse_traffic(value: Option<&Value>) -> Result<TrafficLevel, LoadError> {
    let Some(value) = value else {
        return Ok(TrafficLevel::Normal);
    };
    let level = match value {
        Value::String(text) => TrafficLevel::parse(text),
        Value::Number(number) => number.as_f64().and_then(|multiplier| {
            [
                TrafficLevel::Empty,
                TrafficLevel::Normal,
                TrafficLevel::Heavy,
                TrafficLevel::VeryHeavy,
            ]
            .into_iter()
            .find(|level| level.multiplier() == multiplier)
            .or((multiplier < 0.0).then_some(TrafficLevel::Accident))
        }),
        _ => None,
    };
    level.ok_or_else(|| LoadError::UnknownTrafficLevel(value_to_name(value)))
}

pub fn load_graph_from_str(raw: &str) -> Result<CityGraph, LoadError> {
    let document: GraphDocument = parse(raw, "graph")?;
    let mut graph = CityGraph::new(document.directed);

    for entry in &document.nodes {
        let name = value_to_name(&entry.name);
        let mut spec = NodeSpec::new(name.clone()).with_kind(parse_node_kind(entry.tipo.as_ref())?);
        if let (Some(x), Some(y)) = (entry.x, entry.y) {
            spec = spec.at(x, y);
        }
        if let Some(attractiveness) = entry.atratividade {
            require_non_negative("node", &name, "attractiveness", attractiveness)?;
            spec = spec.with_attractiveness(attractiveness);
        }
        graph.add_node(spec)?;
    }

    for entry in &document.edges {
        let spec = EdgeSpec::new(entry.nome.clone(), entry.quilometro, entry.velocidade_maxima)
            .with_traffic(parse_traffic(entry.transito.as_ref())?);
        graph.add_edge(&value_to_name(&entry.source), &value_to_name(&entry.target), spec)?;
    }

    log::info!(
        "loaded graph: {} nodes, {} directed edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

pub fn load_graph<P: AsRef<Path>>(path: P) -> Result<CityGraph, LoadError> {
    load_graph_from_str(&read(path.as_ref())?)
}

// ---------------------------------------------------------------------------
// Fleet
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FleetDocument {
    #[serde(alias = "vehicles")]
    veiculos: Vec<VehicleEntry>,
}

#[derive(Debug, Deserialize)]
struct VehicleEntry {
    #[serde(alias = "kind")]
    tipo: String,
    #[serde(alias = "id")]
    id_veiculo: Value,
    #[serde(alias = "max_autonomy_km")]
    autonomia_maxima: f64,
    #[serde(default, alias = "autonomy_km")]
    autonomia_atual: Option<f64>,
    #[serde(alias = "capacity")]
    capacidade_passageiros: u32,
    #[serde(alias = "cost_per_km")]
    custo_operacional_km: f64,
    #[serde(alias = "location")]
    localizacao_atual: NodeRef,
    #[serde(default, alias = "state")]
    estado: Option<String>,
    #[serde(default, alias = "recharge_minutes_per_km")]
    tempo_recarga_km: Option<f64>,
}

fn parse_vehicle_state(raw: &str) -> Result<VehicleState, LoadError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "disponivel" | "available" => Ok(VehicleState::Available),
        "em_andamento" | "en_route" => Ok(VehicleState::EnRoute),
        "indisponivel" | "unavailable" => Ok(VehicleState::Unavailable),
        "em_reabastecimento" | "refueling" => Ok(VehicleState::Refueling),
        "em_manutencao" | "maintenance" => Ok(VehicleState::Maintenance),
        _ => Err(LoadError::UnknownVehicleState(raw.to_string())),
    }
}

/// Loads the fleet. Starting locations must exist in `graph`.
///
/// Vehicles imported as en route or refuelling have no trip or timer behind them, so
/// they start Available.
pub fn load_fleet_from_str(raw: &str, graph: &CityGraph) -> Result<Fleet, LoadError> {
    let document: FleetDocument = parse(raw, "fleet")?;
    let mut fleet = Fleet::default();
    let mut labels = std::collections::BTreeSet::new();

    for entry in &document.veiculos {
        let label = value_to_name(&entry.id_veiculo);
        if !labels.insert(label.clone()) {
            return Err(LoadError::DuplicateId {
                entity: "vehicle",
                id: label,
            });
        }
        let propulsion = match entry.tipo.trim().to_ascii_lowercase().as_str() {
            "combustao" | "combustion" => Propulsion::Combustion,
            "eletrico" | "electric" => {
                let rate = entry.tempo_recarga_km.unwrap_or(DEFAULT_RECHARGE_MINUTES_PER_KM);
                require_non_negative("vehicle", &label, "tempo_recarga_km", rate)?;
                Propulsion::Electric {
                    recharge_minutes_per_km: rate,
                }
            }
            _ => return Err(LoadError::UnknownVehicleKind(entry.tipo.clone())),
        };
        require_positive("vehicle", &label, "autonomia_maxima", entry.autonomia_maxima)?;
        require_non_negative(
            "vehicle",
            &label,
            "custo_operacional_km",
            entry.custo_operacional_km,
        )?;
        if entry.capacidade_passageiros == 0 {
            return Err(LoadError::InvalidField {
                entity: "vehicle",
                id: label,
                field: "capacidade_passageiros",
                expected: "at least 1",
                value: 0.0,
            });
        }
        let autonomy = entry.autonomia_atual.unwrap_or(entry.autonomia_maxima);
        require_non_negative("vehicle", &label, "autonomia_atual", autonomy)?;

        let location = entry.localizacao_atual.resolve(graph).ok_or_else(|| {
            LoadError::UnknownStartLocation {
                vehicle: label.clone(),
                node: entry.localizacao_atual.display(),
            }
        })?;
        let state = match entry.estado.as_deref() {
            None => VehicleState::Available,
            Some(raw) => match parse_vehicle_state(raw)? {
                VehicleState::EnRoute | VehicleState::Refueling => VehicleState::Available,
                state => state,
            },
        };

        fleet.push(
            Vehicle::new(
                VehicleId(0),
                label,
                propulsion,
                entry.autonomia_maxima,
                entry.capacidade_passageiros,
                entry.custo_operacional_km,
                location,
            )
            .with_autonomy(autonomy)
            .with_state(state),
        );
    }

    log::info!("loaded fleet: {} vehicles", fleet.len());
    Ok(fleet)
}

pub fn load_fleet<P: AsRef<Path>>(path: P, graph: &CityGraph) -> Result<Fleet, LoadError> {
    load_fleet_from_str(&read(path.as_ref())?, graph)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RequestDocument {
    #[serde(alias = "requests")]
    pedidos: Vec<RequestEntry>,
}

#[derive(Debug, Deserialize)]
struct RequestEntry {
    #[serde(alias = "id")]
    pedido_id: u64,
    #[serde(alias = "origin")]
    origem: NodeRef,
    #[serde(alias = "destination")]
    destino: NodeRef,
    #[serde(alias = "passengers")]
    passageiros: u32,
    #[serde(alias = "desired_at")]
    horario_pretendido: String,
    #[serde(default = "default_priority", alias = "priority")]
    prioridade: i32,
    #[serde(default, alias = "eco_preference")]
    preferencia_ambiental: Value,
    #[serde(default, alias = "ride_sharing")]
    ride_sharing: bool,
    #[serde(default, alias = "state")]
    estado: Option<String>,
}

fn default_priority() -> i32 {
    1
}

/// Accepts booleans and the 0/1 integers some data sets use.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    raw.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").ok())
}

/// Loads requests and converts their desired times to simulation milliseconds.
///
/// Times are measured from `start`, or from the earliest request when `start` is
/// `None`. Requests desired before the start are scheduled at time zero. Requests marked
/// as cancelled in the document are kept but withdrawn.
pub fn load_requests_from_str(
    raw: &str,
    graph: &CityGraph,
    start: Option<NaiveDateTime>,
) -> Result<RequestBook, LoadError> {
    let document: RequestDocument = parse(raw, "requests")?;

    let mut parsed = Vec::with_capacity(document.pedidos.len());
    for entry in &document.pedidos {
        let at = parse_timestamp(&entry.horario_pretendido).ok_or_else(|| LoadError::BadTimestamp {
            request: entry.pedido_id,
            value: entry.horario_pretendido.clone(),
        })?;
        parsed.push((entry, at));
    }
    let origin_time = start.or_else(|| parsed.iter().map(|(_, at)| *at).min());

    let mut book = RequestBook::default();
    for (entry, at) in parsed {
        let resolve = |node: &NodeRef| {
            node.resolve(graph).ok_or_else(|| LoadError::UnknownRequestNode {
                request: entry.pedido_id,
                node: node.display(),
            })
        };
        let origin = resolve(&entry.origem)?;
        let destination = resolve(&entry.destino)?;
        if entry.passageiros == 0 {
            return Err(LoadError::InvalidField {
                entity: "request",
                id: entry.pedido_id.to_string(),
                field: "passageiros",
                expected: "at least 1",
                value: 0.0,
            });
        }

        let offset_ms = origin_time
            .map(|origin_time| (at - origin_time).num_milliseconds().max(0) as u64)
            .unwrap_or(0);
        let mut request = Request::new(entry.pedido_id, origin, destination, entry.passageiros)
            .at(offset_ms)
            .with_priority(entry.prioridade);
        request.eco_preference = truthy(&entry.preferencia_ambiental);
        request.ride_sharing = entry.ride_sharing;

        if !book.insert(request) {
            return Err(LoadError::DuplicateId {
                entity: "request",
                id: entry.pedido_id.to_string(),
            });
        }
        let cancelled = entry
            .estado
            .as_deref()
            .is_some_and(|state| {
                matches!(
                    state.trim().to_ascii_lowercase().as_str(),
                    "cancelado" | "cancelled"
                )
            });
        if cancelled {
            book.withdraw(RequestId(entry.pedido_id));
        }
    }

    log::info!(
        "loaded {} requests ({} withdrawn)",
        book.len(),
        book.iter().filter(|r| r.state == RequestState::Cancelled).count()
    );
    Ok(book)
}

pub fn load_requests<P: AsRef<Path>>(
    path: P,
    graph: &CityGraph,
    start: Option<NaiveDateTime>,
) -> Result<RequestBook, LoadError> {
    load_requests_from_str(&read(path.as_ref())?, graph, start)
}

// ---------------------------------------------------------------------------
// Traffic events
// ---------------------------------------------------------------------------

/// The document is either a bare list or `{ "eventos": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TrafficDocument {
    List(Vec<TrafficEntry>),
    Wrapped {
        #[serde(alias = "events")]
        eventos: Vec<TrafficEntry>,
    },
}

#[derive(Debug, Deserialize)]
struct TrafficEntry {
    #[serde(alias = "minute")]
    minuto_simulacao: f64,
    #[serde(alias = "edge")]
    aresta: String,
    #[serde(alias = "level")]
    nivel: Value,
    #[serde(default, alias = "duration_minutes")]
    duracao_minutos: Option<f64>,
    #[serde(default, alias = "description")]
    descricao: Option<String>,
}

fn minutes_to_ms(minutes: f64) -> u64 {
    (minutes * ONE_MIN_MS as f64).round() as u64
}

/// Loads scheduled traffic changes.
///
/// An event with a duration and a level other than normal also gets a restore-to-normal
/// change at `minute + duration`. Unknown edge names are not an error here: they are
/// logged and skipped when the change fires.
pub fn load_traffic_events_from_str(raw: &str) -> Result<TrafficTimeline, LoadError> {
    let document: TrafficDocument = parse(raw, "traffic events")?;
    let entries = match document {
        TrafficDocument::List(entries) => entries,
        TrafficDocument::Wrapped { eventos } => eventos,
    };

    let mut timeline = TrafficTimeline::default();
    for entry in entries {
        require_non_negative(
            "traffic event",
            &entry.aresta,
            "minuto_simulacao",
            entry.minuto_simulacao,
        )?;
        let level = parse_traffic(Some(&entry.nivel))?;
        let at = minutes_to_ms(entry.minuto_simulacao);
        let description = entry
            .descricao
            .clone()
            .unwrap_or_else(|| format!("{:?} on {}", level, entry.aresta));
        timeline.push(TrafficChange {
            at,
            edge: entry.aresta.clone(),
            level,
            description,
        });

        if let Some(duration) = entry.duracao_minutos {
            require_non_negative("traffic event", &entry.aresta, "duracao_minutos", duration)?;
            if level != TrafficLevel::Normal {
                timeline.push(TrafficChange {
                    at: at + minutes_to_ms(duration),
                    edge: entry.aresta,
                    level: TrafficLevel::Normal,
                    description: "traffic back to normal".to_string(),
                });
            }
        }
    }

    log::info!("loaded {} traffic changes", timeline.len());
    Ok(timeline)
}

pub fn load_traffic_events<P: AsRef<Path>>(path: P) -> Result<TrafficTimeline, LoadError> {
    load_traffic_events_from_str(&read(path.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH: &str = r#"{
        "directed": false,
        "nodes": [
            { "name": "Centro", "id": 0, "tipo": "LOCAL", "x": 0.0, "y": 0.0, "atratividade": 3 },
            { "name": "Bomba", "id": 1, "tipo": 1, "x": 3.0, "y": 4.0 },
            { "name": "Posto", "id": 2, "tipo": "POSTO_CARREGAMENTO" }
        ],
        "edges": [
            { "source": "Centro", "target": "Bomba", "quilometro": 5, "velocidadeMaxima": 50, "nome": "Av1" },
            { "source": "Bomba", "target": "Posto", "quilometro": 2.5, "velocidadeMaxima": 30, "nome": "Av2", "transito": "ELEVADO" }
        ]
    }"#;

    #[test]
    fn graph_document_builds_both_directions() {
        let graph = load_graph_from_str(GRAPH).expect("graph");
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.node_by_name("Bomba").unwrap().kind, NodeKind::FuelStation);
        assert_eq!(graph.node_by_name("Centro").unwrap().attractiveness, 3.0);
        assert_eq!(graph.traffic_level("Av2"), Some(TrafficLevel::Heavy));
        assert!(graph.edge("Posto", "Bomba").is_some());
    }

    #[test]
    fn graph_with_dangling_edge_fails_whole_load() {
        let raw = r#"{ "nodes": [ { "name": "A", "tipo": 0 } ],
            "edges": [ { "source": "A", "target": "Z", "quilometro": 1, "velocidadeMaxima": 10, "nome": "AZ" } ] }"#;
        assert!(matches!(
            load_graph_from_str(raw),
            Err(LoadError::UnknownNode { .. })
        ));
        assert!(matches!(
            load_graph_from_str("{ not json"),
            Err(LoadError::Json { document: "graph", .. })
        ));
    }

    #[test]
    fn fleet_resolves_locations_and_propulsion() {
        let graph = load_graph_from_str(GRAPH).expect("graph");
        let raw = r#"{ "veiculos": [
            { "tipo": "combustao", "id_veiculo": 1, "autonomia_maxima": 500, "autonomia_atual": 450,
              "capacidade_passageiros": 4, "custo_operacional_km": 0.15, "localizacao_atual": "Centro" },
            { "tipo": "eletrico", "id_veiculo": "E2", "autonomia_maxima": 300, "autonomia_atual": 100,
              "capacidade_passageiros": 4, "custo_operacional_km": 0.05, "localizacao_atual": 2,
              "estado": "EM_MANUTENCAO", "tempo_recarga_km": 1.5 }
        ] }"#;
        let fleet = load_fleet_from_str(raw, &graph).expect("fleet");
        assert_eq!(fleet.len(), 2);
        let ev = fleet.by_label("E2").unwrap();
        assert_eq!(ev.location, "Posto");
        assert_eq!(ev.state, VehicleState::Maintenance);
        assert_eq!(
            ev.propulsion,
            Propulsion::Electric {
                recharge_minutes_per_km: 1.5
            }
        );
        assert_eq!(fleet.by_label("1").unwrap().autonomy_km, 450.0);
    }

    #[test]
    fn fleet_rejects_unknown_kind_and_location() {
        let graph = load_graph_from_str(GRAPH).expect("graph");
        let hovercraft = r#"{ "veiculos": [ { "tipo": "hovercraft", "id_veiculo": 1, "autonomia_maxima": 1,
            "capacidade_passageiros": 1, "custo_operacional_km": 1, "localizacao_atual": "Centro" } ] }"#;
        assert!(matches!(
            load_fleet_from_str(hovercraft, &graph),
            Err(LoadError::UnknownVehicleKind(_))
        ));
        let lost = r#"{ "veiculos": [ { "tipo": "combustao", "id_veiculo": 1, "autonomia_maxima": 1,
            "capacidade_passageiros": 1, "custo_operacional_km": 1, "localizacao_atual": "Atlantis" } ] }"#;
        assert!(matches!(
            load_fleet_from_str(lost, &graph),
            Err(LoadError::UnknownStartLocation { .. })
        ));
    }

    #[test]
    fn request_times_are_relative_to_earliest() {
        let graph = load_graph_from_str(GRAPH).expect("graph");
        let raw = r#"{ "pedidos": [
            { "pedido_id": 7, "origem": 0, "destino": "Posto", "passageiros": 2,
              "horario_pretendido": "2025-01-01T08:30:00", "prioridade": 3, "preferencia_ambiental": 1 },
            { "pedido_id": 8, "origem": "Bomba", "destino": "Centro", "passageiros": 1,
              "horario_pretendido": "2025-01-01T08:00:00", "ride_sharing": true, "estado": "CANCELADO" }
        ] }"#;
        let book = load_requests_from_str(raw, &graph, None).expect("requests");
        let first = book.get(RequestId(7)).unwrap();
        assert_eq!(first.origin, "Centro");
        assert_eq!(first.desired_at, 30 * ONE_MIN_MS);
        assert_eq!(first.priority, 3);
        assert!(first.eco_preference);
        let second = book.get(RequestId(8)).unwrap();
        assert_eq!(second.desired_at, 0);
        assert!(second.ride_sharing);
        assert_eq!(second.state, RequestState::Cancelled);
    }

    #[test]
    fn request_with_bad_timestamp_fails() {
        let graph = load_graph_from_str(GRAPH).expect("graph");
        let raw = r#"{ "pedidos": [ { "pedido_id": 1, "origem": "Centro", "destino": "Posto",
            "passageiros": 1, "horario_pretendido": "tomorrow-ish" } ] }"#;
        assert!(matches!(
            load_requests_from_str(raw, &graph, None),
            Err(LoadError::BadTimestamp { request: 1, .. })
        ));
    }

    #[test]
    fn traffic_events_schedule_restores() {
        let raw = r#"[
            { "minuto_simulacao": 10, "aresta": "Av1", "nivel": "ACIDENTE", "duracao_minutos": 30 },
            { "minuto_simulacao": 20, "aresta": "Av2", "nivel": "NORMAL", "duracao_minutos": 5 }
        ]"#;
        let timeline = load_traffic_events_from_str(raw).expect("traffic");
        let changes: Vec<(u64, &str, TrafficLevel)> = timeline
            .iter()
            .map(|c| (c.at, c.edge.as_str(), c.level))
            .collect();
        assert_eq!(
            changes,
            vec![
                (10 * ONE_MIN_MS, "Av1", TrafficLevel::Accident),
                (40 * ONE_MIN_MS, "Av1", TrafficLevel::Normal),
                (20 * ONE_MIN_MS, "Av2", TrafficLevel::Normal),
            ]
        );
        assert!(matches!(
            load_traffic_events_from_str(r#"[{ "minuto_simulacao": 1, "aresta": "Av1", "nivel": "LAVA" }]"#),
            Err(LoadError::UnknownTrafficLevel(_))
        ));
    }
}
