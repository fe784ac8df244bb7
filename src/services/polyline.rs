// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Decoding of Strava summary polylines into GeoJSON LineStrings.
//!
//! The encoding stores each coordinate as a (latitude, longitude) pair of
//! deltas from the previous point, in units of 1e-5 degrees. Every delta is
//! zigzag-style sign folded and split into 5-bit chunks, low bits first;
//! each chunk is offset by 63 to land in printable ASCII and carries a
//! continuation flag in bit 0x20.

use geojson::{Geometry, Value};

use crate::error::GeometryDecodeError;

/// Coordinates are stored as integers of 1e-5 degrees.
const PRECISION: f64 = 100_000.0;

const CHUNK_OFFSET: u8 = 63;
const CHUNK_BITS: u64 = 0x1f;
const CONTINUATION: u64 = 0x20;
const VALUE_BITS: u32 = u64::BITS;

/// Decode an encoded polyline into `(longitude, latitude)` pairs.
pub fn decode(polyline: &str) -> Result<Vec<(f64, f64)>, GeometryDecodeError> {
    let bytes = polyline.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut coordinates = Vec::new();

    while index < bytes.len() {
        let start = index;
        let lat_delta = next_delta(bytes, &mut index)?;
        if index >= bytes.len() {
            // A latitude without its longitude.
            return Err(GeometryDecodeError::Truncated { offset: index });
        }
        let lng_delta = next_delta(bytes, &mut index)?;

        lat = lat
            .checked_add(lat_delta)
            .ok_or(GeometryDecodeError::Overflow { offset: start })?;
        lng = lng
            .checked_add(lng_delta)
            .ok_or(GeometryDecodeError::Overflow { offset: start })?;

        coordinates.push((lng as f64 / PRECISION, lat as f64 / PRECISION));
    }

    Ok(coordinates)
}

/// Decode an encoded polyline into a GeoJSON LineString geometry.
pub fn decode_geometry(polyline: &str) -> Result<Geometry, GeometryDecodeError> {
    let positions = decode(polyline)?
        .into_iter()
        .map(|(lon, lat)| vec![lon, lat])
        .collect();
    Ok(Geometry::new(Value::LineString(positions)))
}

/// Decode an encoded polyline into serialized GeoJSON, as stored in
/// `activities.summary_geojson`.
pub fn decode_geojson(polyline: &str) -> Result<String, GeometryDecodeError> {
    Ok(decode_geometry(polyline)?.to_string())
}

/// Read one signed delta starting at `*index`, advancing past it.
fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, GeometryDecodeError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let offset = *index;
        let byte = *bytes
            .get(offset)
            .ok_or(GeometryDecodeError::Truncated { offset })?;
        if !(CHUNK_OFFSET..=CHUNK_OFFSET + 63).contains(&byte) {
            return Err(GeometryDecodeError::InvalidByte { offset, byte });
        }

        let chunk = u64::from(byte - CHUNK_OFFSET);
        let payload = chunk & CHUNK_BITS;
        // Any payload bit shifted past bit 63 would be lost.
        if shift >= VALUE_BITS || payload.leading_zeros() < shift {
            return Err(GeometryDecodeError::Overflow { offset });
        }
        result |= payload << shift;
        shift += 5;
        *index += 1;

        if chunk & CONTINUATION == 0 {
            break;
        }
    }

    let value = (result >> 1) as i64;
    Ok(if result & 1 == 1 { !value } else { value })
}
