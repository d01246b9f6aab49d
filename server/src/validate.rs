use crate::model::NewReading;

/// Checks a path-derived device id. Returns the reason it was rejected.
pub fn validate_device_id(device_id: &str) -> Result<(), String> {
    if device_id.is_empty() {
        return Err("Device ID cannot be empty".to_string());
    }

    if device_id.contains('\0') {
        return Err("Device ID cannot contain a NUL character".to_string());
    }

    Ok(())
}

/// Row checks mirrored from the `readings` table: `device_id` carries a
/// non-empty CHECK, and PostgreSQL text columns cannot hold NUL.
pub fn check_row_constraints(reading: &NewReading) -> Result<(), String> {
    if reading.device_id.is_empty() {
        return Err("readings_device_id_check".to_string());
    }

    if reading.device_id.contains('\0') {
        return Err("device_id contains a NUL character".to_string());
    }

    if reading.blob.contains('\0') {
        return Err("blob contains a NUL character".to_string());
    }

    Ok(())
}
