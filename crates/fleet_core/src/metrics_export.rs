use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::metrics::FleetMetrics;
use crate::telemetry::SimSnapshots;

pub fn write_trip_records_parquet<P: AsRef<Path>>(
    path: P,
    metrics: &FleetMetrics,
) -> Result<(), Box<dyn Error>> {
    let len = metrics.trips.len();
    let mut request = Vec::with_capacity(len);
    let mut vehicle = Vec::with_capacity(len);
    let mut accepted_at = Vec::with_capacity(len);
    let mut picked_up_at = Vec::with_capacity(len);
    let mut completed_at = Vec::with_capacity(len);
    let mut response_minutes = Vec::with_capacity(len);
    let mut distance_km = Vec::with_capacity(len);
    let mut cost = Vec::with_capacity(len);
    let mut emissions_kg = Vec::with_capacity(len);
    let mut shared = Vec::with_capacity(len);

    for record in &metrics.trips {
        request.push(record.request.0);
        vehicle.push(record.vehicle.0);
        accepted_at.push(record.accepted_at);
        picked_up_at.push(record.picked_up_at);
        completed_at.push(record.completed_at);
        response_minutes.push(record.response_minutes);
        distance_km.push(record.distance_km);
        cost.push(record.cost);
        emissions_kg.push(record.emissions_kg);
        shared.push(record.shared);
    }

    let schema = Schema::new(vec![
        Field::new("request", DataType::UInt64, false),
        Field::new("vehicle", DataType::UInt32, false),
        Field::new("accepted_at", DataType::UInt64, false),
        Field::new("picked_up_at", DataType::UInt64, true),
        Field::new("completed_at", DataType::UInt64, true),
        Field::new("response_minutes", DataType::Float64, false),
        Field::new("distance_km", DataType::Float64, false),
        Field::new("cost", DataType::Float64, false),
        Field::new("emissions_kg", DataType::Float64, false),
        Field::new("shared", DataType::Boolean, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(request)),
        Arc::new(UInt32Array::from(vehicle)),
        Arc::new(UInt64Array::from(accepted_at)),
        Arc::new(UInt64Array::from(picked_up_at)),
        Arc::new(UInt64Array::from(completed_at)),
        Arc::new(Float64Array::from(response_minutes)),
        Arc::new(Float64Array::from(distance_km)),
        Arc::new(Float64Array::from(cost)),
        Arc::new(Float64Array::from(emissions_kg)),
        Arc::new(BooleanArray::from(shared)),
    ];

    write_record_batch(path, schema, arrays)
}

pub fn write_rejections_parquet<P: AsRef<Path>>(
    path: P,
    metrics: &FleetMetrics,
) -> Result<(), Box<dyn Error>> {
    let request: Vec<u64> = metrics.rejections.iter().map(|r| r.request.0).collect();
    let at: Vec<u64> = metrics.rejections.iter().map(|r| r.at).collect();
    let reason: Vec<String> = metrics.rejections.iter().map(|r| r.reason.to_string()).collect();
    let penalty: Vec<f64> = metrics.rejections.iter().map(|r| r.penalty).collect();

    let schema = Schema::new(vec![
        Field::new("request", DataType::UInt64, false),
        Field::new("at", DataType::UInt64, false),
        Field::new("reason", DataType::Utf8, false),
        Field::new("penalty", DataType::Float64, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(request)),
        Arc::new(UInt64Array::from(at)),
        Arc::new(StringArray::from(reason)),
        Arc::new(Float64Array::from(penalty)),
    ];

    write_record_batch(path, schema, arrays)
}

pub fn write_snapshot_counts_parquet<P: AsRef<Path>>(
    path: P,
    snapshots: &SimSnapshots,
) -> Result<(), Box<dyn Error>> {
    let len = snapshots.snapshots.len();
    let mut timestamp_ms = Vec::with_capacity(len);
    let mut vehicles_available = Vec::with_capacity(len);
    let mut vehicles_en_route = Vec::with_capacity(len);
    let mut vehicles_refueling = Vec::with_capacity(len);
    let mut vehicles_unavailable = Vec::with_capacity(len);
    let mut active_trips = Vec::with_capacity(len);
    let mut requests_pending = Vec::with_capacity(len);
    let mut requests_completed = Vec::with_capacity(len);
    let mut requests_rejected = Vec::with_capacity(len);

    for snapshot in &snapshots.snapshots {
        let counts = &snapshot.counts;
        timestamp_ms.push(snapshot.timestamp_ms);
        vehicles_available.push(counts.vehicles_available as u64);
        vehicles_en_route.push(counts.vehicles_en_route as u64);
        vehicles_refueling.push(counts.vehicles_refueling as u64);
        vehicles_unavailable.push(counts.vehicles_unavailable as u64);
        active_trips.push(counts.active_trips as u64);
        requests_pending.push(counts.requests_pending as u64);
        requests_completed.push(counts.requests_completed as u64);
        requests_rejected.push(counts.requests_rejected as u64);
    }

    let schema = Schema::new(vec![
        Field::new("timestamp_ms", DataType::UInt64, false),
        Field::new("vehicles_available", DataType::UInt64, false),
        Field::new("vehicles_en_route", DataType::UInt64, false),
        Field::new("vehicles_refueling", DataType::UInt64, false),
        Field::new("vehicles_unavailable", DataType::UInt64, false),
        Field::new("active_trips", DataType::UInt64, false),
        Field::new("requests_pending", DataType::UInt64, false),
        Field::new("requests_completed", DataType::UInt64, false),
        Field::new("requests_rejected", DataType::UInt64, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(timestamp_ms)),
        Arc::new(UInt64Array::from(vehicles_available)),
        Arc::new(UInt64Array::from(vehicles_en_route)),
        Arc::new(UInt64Array::from(vehicles_refueling)),
        Arc::new(UInt64Array::from(vehicles_unavailable)),
        Arc::new(UInt64Array::from(active_trips)),
        Arc::new(UInt64Array::from(requests_pending)),
        Arc::new(UInt64Array::from(requests_completed)),
        Arc::new(UInt64Array::from(requests_rejected)),
    ];

    write_record_batch(path, schema, arrays)
}

fn write_record_batch<P: AsRef<Path>>(
    path: P,
    schema: Schema,
    arrays: Vec<ArrayRef>,
) -> Result<(), Box<dyn Error>> {
    let schema = Arc::new(schema);
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
