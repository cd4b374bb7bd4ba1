//! # CLI Command Implementations
//!
//! Renderers return strings; this module owns every file read and write.

use super::{GraphSource, ResolveArgs};
use crate::config::{BulletinConfig, Config};
use quakebook_core::{
    Bulletin, BulletinOptions, ChannelResponse, CubeOptions, EntityKind, EventGraph, LookupChain,
    MemoryStore, MomentTensorSheet, PublicId, QuakeError, Session, cube_format, export_responses,
    graph_from_bytes, graph_from_json, graph_to_bytes, graph_to_json, is_binary, summary,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a graph or response file (500 MB).
const MAX_INPUT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), QuakeError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| QuakeError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(QuakeError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and ensure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, QuakeError> {
    let canonical = path.canonicalize().map_err(|e| {
        QuakeError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(QuakeError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent of an output path.
fn validate_output_path(path: &Path) -> Result<PathBuf, QuakeError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        QuakeError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(QuakeError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| QuakeError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn read_input(path: &Path) -> Result<Vec<u8>, QuakeError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_INPUT_FILE_SIZE)?;
    std::fs::read(&validated)
        .map_err(|e| QuakeError::IoError(format!("Read '{}': {}", path.display(), e)))
}

// =============================================================================
// GRAPH LOADING
// =============================================================================

/// Parse a graph file, binary if it starts with the magic bytes.
pub fn read_graph_file(path: &Path) -> Result<EventGraph, QuakeError> {
    let data = read_input(path)?;
    if is_binary(&data) {
        return graph_from_bytes(&data);
    }
    let text = std::str::from_utf8(&data)
        .map_err(|e| QuakeError::DeserializationError(format!("Not UTF-8 JSON: {}", e)))?;
    graph_from_json(text)
}

/// Open the session a graph command works on and resolve its event.
///
/// A graph file is loaded into an in-memory store and resolved again so the
/// same options apply to files and to the database.
pub fn load_graph(
    config: &Config,
    database: &Path,
    source: &GraphSource,
    resolve: &ResolveArgs,
) -> Result<(Session, EventGraph), QuakeError> {
    let mut options = config.resolve.clone();
    resolve.apply(&mut options);

    let (mut session, event_id) = match (&source.input, &source.event) {
        (Some(input), _) => {
            let graph = read_graph_file(input)?;
            let event_id = graph.event().public_id.clone();
            (Session::with_store(MemoryStore::from_graph(&graph)), event_id)
        }
        (None, Some(event)) => (Session::with_redb(database)?, PublicId::new(event.as_str())),
        (None, None) => {
            return Err(QuakeError::InvalidFormat(
                "Either --input or --event is required".to_string(),
            ));
        }
    };

    let graph = session.resolve(&event_id, &options)?;
    for diagnostic in graph.diagnostics() {
        tracing::info!("{}: {}", diagnostic.id, diagnostic.message);
    }
    Ok((session, graph))
}

// =============================================================================
// BULLETIN COMMAND
// =============================================================================

/// Print a bulletin of the preferred or the given origin.
pub fn cmd_bulletin(
    config: &Config,
    database: &Path,
    source: &GraphSource,
    resolve: &ResolveArgs,
    bulletin: &BulletinConfig,
    origin_id: Option<&str>,
) -> Result<(), QuakeError> {
    let mut resolve = resolve.clone();
    // The phase table needs picks and the magnitude table all magnitudes.
    resolve.picks = true;
    resolve.all_magnitudes = true;
    let (session, graph) = load_graph(config, database, source, &resolve)?;

    let bulletin = Bulletin::new(BulletinOptions::from(bulletin));
    let text = match origin_id {
        None => bulletin.format_event_with_registry(&graph, session.registry())?,
        Some(id) => {
            let origin = graph.origin(id).ok_or_else(|| {
                QuakeError::not_found(EntityKind::Origin, &PublicId::new(id))
            })?;
            let lookup = LookupChain::new(&graph, session.registry());
            bulletin.format_origin(origin, Some(graph.event()), &lookup)
        }
    };
    print!("{}", text);
    Ok(())
}

// =============================================================================
// MT COMMAND
// =============================================================================

/// Print the moment tensor sheet of the preferred or the given focal mechanism.
pub fn cmd_mt(
    config: &Config,
    database: &Path,
    source: &GraphSource,
    resolve: &ResolveArgs,
    focal_mechanism_id: Option<&str>,
) -> Result<(), QuakeError> {
    let (_session, graph) = load_graph(config, database, source, resolve)?;

    let fm = match focal_mechanism_id {
        Some(id) => graph.focal_mechanism(id).ok_or_else(|| {
            QuakeError::not_found(EntityKind::FocalMechanism, &PublicId::new(id))
        })?,
        None => graph.preferred_focal_mechanism().ok_or_else(|| {
            QuakeError::InvalidFormat(format!(
                "Event {} has no preferred focal mechanism",
                graph.event().public_id
            ))
        })?,
    };

    let sheet = MomentTensorSheet::new().with_fallback_agency(config.mt.fallback_agency_id.as_str());
    print!("{}", sheet.render(&graph, fm)?);
    Ok(())
}

// =============================================================================
// CUBE COMMAND
// =============================================================================

/// Print the CUBE line, preceded by the summary when verbose.
pub fn cmd_cube(
    config: &Config,
    database: &Path,
    source: &GraphSource,
    resolve: &ResolveArgs,
    cube: &CubeOptions,
    verbose: bool,
) -> Result<(), QuakeError> {
    let (_session, graph) = load_graph(config, database, source, resolve)?;

    if verbose {
        print!("{}", summary(&graph)?);
    }
    println!("{}", cube_format(&graph, cube)?);
    Ok(())
}

// =============================================================================
// DUMP COMMAND
// =============================================================================

/// Write the resolved graph as JSON or binary.
pub fn cmd_dump(
    config: &Config,
    database: &Path,
    source: &GraphSource,
    resolve: &ResolveArgs,
    format: &str,
    output: Option<&Path>,
) -> Result<(), QuakeError> {
    let (_session, graph) = load_graph(config, database, source, resolve)?;

    let data = match format {
        "json" => {
            let text = graph_to_json(&graph)?;
            if output.is_none() {
                println!("{}", text);
                return Ok(());
            }
            text.into_bytes()
        }
        "binary" => graph_to_bytes(&graph)?,
        _ => {
            return Err(QuakeError::InvalidFormat(format!(
                "Unknown format: {}. Use: json, binary",
                format
            )));
        }
    };

    let output = output.ok_or_else(|| {
        QuakeError::InvalidFormat("Binary output requires --output".to_string())
    })?;
    let validated_output = validate_output_path(output)?;
    std::fs::write(&validated_output, &data)
        .map_err(|e| QuakeError::IoError(format!("Write file: {}", e)))?;

    tracing::info!("Wrote {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Load a graph file into the database.
pub fn cmd_import(database: &Path, input: &Path) -> Result<(), QuakeError> {
    let graph = read_graph_file(input)?;
    let mut session = Session::with_redb(database)?;
    session.import_graph(&graph)?;

    println!(
        "Imported event {} ({} origins, {} focal mechanisms, {} picks)",
        graph.event().public_id,
        graph.origins().count(),
        graph.focal_mechanisms().count(),
        graph.picks().count()
    );
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show database contents.
pub fn cmd_status(database: &Path, json_mode: bool) -> Result<(), QuakeError> {
    let session = Session::with_redb(database)?;
    let counts = session.counts()?;

    if json_mode {
        let output = serde_json::json!({
            "database": database.to_string_lossy(),
            "events": counts.events,
            "origins": counts.origins,
            "magnitudes": counts.magnitudes,
            "focal_mechanisms": counts.focal_mechanisms,
            "picks": counts.picks,
            "amplitudes": counts.amplitudes
        });
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| QuakeError::SerializationError(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Quakebook Database Status");
    println!("=========================");
    println!("Database: {:?}", database);
    println!();
    println!("Events:           {}", counts.events);
    println!("Origins:          {}", counts.origins);
    println!("Magnitudes:       {}", counts.magnitudes);
    println!("Focal mechanisms: {}", counts.focal_mechanisms);
    println!("Picks:            {}", counts.picks);
    println!("Amplitudes:       {}", counts.amplitudes);

    Ok(())
}

// =============================================================================
// SACPZ COMMAND
// =============================================================================

/// Write one SAC PZ file per channel. Failed channels are skipped.
pub fn cmd_sacpz(input: &Path, output_dir: &Path) -> Result<(), QuakeError> {
    let data = read_input(input)?;
    let responses: Vec<ChannelResponse> = serde_json::from_slice(&data)
        .map_err(|e| QuakeError::DeserializationError(e.to_string()))?;

    if !output_dir.is_dir() {
        return Err(QuakeError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            output_dir.display()
        )));
    }

    let mut written = 0usize;
    for export in export_responses(&responses) {
        let Ok(text) = &export.result else {
            continue;
        };
        let path = output_dir.join(export.file_name());
        std::fs::write(&path, text)
            .map_err(|e| QuakeError::IoError(format!("Write {:?}: {}", path, e)))?;
        written += 1;
    }

    println!(
        "Wrote {} of {} response files to {:?}",
        written,
        responses.len(),
        output_dir
    );
    Ok(())
}
