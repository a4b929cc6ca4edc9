//! Library of pre-generated dark brem vertices.
//!
//! Vertices are read from LHE files (one `<event>` block per vertex) and
//! grouped by the energy of the incoming lepton. The library itself is
//! immutable after loading and can be shared between runs; the per-bucket read
//! position lives in a separate [`LibraryCursor`] owned by whoever samples.

use crate::error::LoadError;
use crate::four_vector::FourMomentum;
use crate::track::DARK_PHOTON_PDG;
use crate::units::GEV;
use rand::Rng;
use std::path::{Path, PathBuf};

/// Alternate PDG code some generators use for the dark photon
const DARK_PHOTON_PDG_ALT: i32 = 1023;
/// Incident energies closer than this (relative) share a bucket
const ENERGY_GROUPING_TOLERANCE: f64 = 1e-6;

/// One outgoing-lepton configuration taken from the library.
///
/// All quantities are in MeV and in the frame of the generated event, where
/// the incident lepton travels along +z.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexRecord {
    /// Total energy of the incoming lepton
    pub incident_energy: f64,
    /// Outgoing lepton energy over incident energy, in (0, 1]
    pub fraction: f64,
    /// Outgoing lepton momentum transverse to the beam
    pub pt: f64,
    /// Azimuth of the outgoing lepton momentum
    pub phi: f64,
    /// Outgoing lepton four-momentum
    pub lepton: FourMomentum,
    /// Sum of the outgoing lepton and dark photon four-momenta
    pub center_momentum: Option<FourMomentum>,
}

impl VertexRecord {
    /// Build a record from the incoming/outgoing lepton and (optionally) the
    /// dark photon, everything in MeV.
    pub fn from_momenta(
        incident_energy: f64,
        lepton: FourMomentum,
        dark_photon: Option<FourMomentum>,
    ) -> Self {
        Self {
            incident_energy,
            fraction: lepton.e / incident_energy,
            pt: lepton.pt(),
            phi: lepton.phi(),
            lepton,
            center_momentum: dark_photon.map(|a| lepton + a),
        }
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    energy: f64,
    records: Vec<VertexRecord>,
}

/// Vertices grouped by incident energy, sorted ascending.
#[derive(Debug, Clone)]
pub struct VertexLibrary {
    buckets: Vec<Bucket>,
}

/// Result of a library lookup.
#[derive(Debug, Clone, Copy)]
pub struct LibrarySample<'a> {
    pub record: &'a VertexRecord,
    /// The requested energy was above every bucket, so the highest one was
    /// used and the vertex will be scaled up rather than down.
    pub above_library: bool,
}

impl VertexLibrary {
    /// Load a single `.lhe` file or every `*.lhe` file in a directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let io_err = |source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        };

        let files: Vec<PathBuf> = if path.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(path).map_err(io_err)? {
                let entry = entry.map_err(io_err)?;
                let p = entry.path();
                if p.extension().map_or(false, |ext| ext == "lhe") {
                    files.push(p);
                }
            }
            files.sort();
            files
        } else {
            vec![path.to_path_buf()]
        };

        let mut records = Vec::new();
        for file in &files {
            let text = std::fs::read_to_string(file).map_err(|source| LoadError::Io {
                path: file.clone(),
                source,
            })?;
            let parsed = parse_lhe(&text, &file.display().to_string())?;
            log::debug!("Read {} dark brem vertices from {}", parsed.len(), file.display());
            records.extend(parsed);
        }

        let library =
            Self::from_records(records).ok_or_else(|| LoadError::Empty(path.to_path_buf()))?;
        log::info!(
            "Loaded dark brem vertex library '{}': {} vertices in {} energy bins ({:.1} - {:.1} MeV)",
            path.display(),
            library.len(),
            library.buckets.len(),
            library.buckets[0].energy,
            library.buckets[library.buckets.len() - 1].energy,
        );
        Ok(library)
    }

    /// Group records by incident energy. Returns `None` for an empty set.
    pub fn from_records(mut records: Vec<VertexRecord>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        // stable sort keeps the on-disk order inside a bucket
        records.sort_by(|a, b| a.incident_energy.total_cmp(&b.incident_energy));

        let mut buckets: Vec<Bucket> = Vec::new();
        for record in records {
            match buckets.last_mut() {
                Some(bucket)
                    if (record.incident_energy - bucket.energy).abs()
                        <= ENERGY_GROUPING_TOLERANCE * bucket.energy =>
                {
                    bucket.records.push(record)
                }
                _ => buckets.push(Bucket {
                    energy: record.incident_energy,
                    records: vec![record],
                }),
            }
        }
        Some(Self { buckets })
    }

    /// Total number of vertices
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Bucket energies, ascending
    pub fn energies(&self) -> Vec<f64> {
        self.buckets.iter().map(|b| b.energy).collect()
    }

    pub fn max_energy(&self) -> f64 {
        self.buckets.last().map_or(0.0, |b| b.energy)
    }

    /// Records stored for the bucket at `index`
    pub fn bucket_records(&self, index: usize) -> &[VertexRecord] {
        &self.buckets[index].records
    }

    /// Index of the bucket with the smallest energy ≥ `energy`, or the last
    /// bucket with `true` if the energy is above the library.
    pub fn bucket_index(&self, energy: f64) -> (usize, bool) {
        let idx = self.buckets.partition_point(|b| b.energy < energy);
        if idx == self.buckets.len() {
            (self.buckets.len() - 1, true)
        } else {
            (idx, false)
        }
    }

    /// Fresh cursor with a uniformly random starting offset in every bucket.
    pub fn cursor<R: Rng + ?Sized>(&self, rng: &mut R) -> LibraryCursor {
        LibraryCursor {
            positions: self
                .buckets
                .iter()
                .map(|b| rng.gen_range(0..b.records.len()))
                .collect(),
        }
    }
}

/// Per-bucket read positions into a [`VertexLibrary`].
///
/// Each call to [`LibraryCursor::sample`] returns the record at the current
/// position of the chosen bucket and advances it by one, wrapping at the end.
#[derive(Debug, Clone)]
pub struct LibraryCursor {
    positions: Vec<usize>,
}

impl LibraryCursor {
    /// Cursor starting at the first record of every bucket
    pub fn at_start(library: &VertexLibrary) -> Self {
        Self {
            positions: vec![0; library.buckets.len()],
        }
    }

    pub fn sample<'a>(&mut self, library: &'a VertexLibrary, energy: f64) -> LibrarySample<'a> {
        let (idx, above_library) = library.bucket_index(energy);

        let records = &library.buckets[idx].records;
        let pos = self.positions[idx];
        self.positions[idx] = (pos + 1) % records.len();
        LibrarySample {
            record: &records[pos],
            above_library,
        }
    }
}

/// Extract dark brem vertices from the text of an LHE file.
///
/// Events that do not contain an incoming lepton, an outgoing lepton of the
/// same flavour and an outgoing dark photon are skipped.
pub fn parse_lhe(text: &str, file_label: &str) -> Result<Vec<VertexRecord>, LoadError> {
    let mut records = Vec::new();
    let mut lines = text.lines().enumerate();

    while let Some((_, line)) = lines.next() {
        if !line.trim_start().starts_with("<event") {
            continue;
        }

        // first non-empty line of the block is the event header
        let (header_no, header) = loop {
            match lines.next() {
                Some((_, l)) if l.trim().is_empty() => continue,
                Some((n, l)) => break (n + 1, l),
                None => {
                    return Err(parse_error(file_label, 0, "unterminated <event> block"));
                }
            }
        };
        let n_particles: usize = header
            .split_whitespace()
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| parse_error(file_label, header_no, "bad particle count in event header"))?;

        let mut particles = Vec::with_capacity(n_particles);
        for _ in 0..n_particles {
            let (n, l) = lines
                .next()
                .ok_or_else(|| parse_error(file_label, header_no, "event ends before all particles are read"))?;
            if l.trim_start().starts_with("</event") {
                return Err(parse_error(file_label, n + 1, "event ends before all particles are read"));
            }
            particles.push(parse_particle(l).map_err(|msg| parse_error(file_label, n + 1, msg))?);
        }

        if let Some(record) = extract_vertex(&particles) {
            records.push(record);
        }
    }
    Ok(records)
}

fn parse_error(file: &str, line: usize, msg: impl Into<String>) -> LoadError {
    LoadError::Parse {
        file: file.to_string(),
        line,
        msg: msg.into(),
    }
}

/// id, status and four-momentum (MeV) of one LHE particle line
struct LheParticle {
    id: i32,
    status: i32,
    momentum: FourMomentum,
}

fn parse_particle(line: &str) -> Result<LheParticle, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 11 {
        return Err(format!("expected at least 11 fields, found {}", fields.len()));
    }
    let int = |i: usize| {
        fields[i]
            .parse::<i32>()
            .map_err(|_| format!("'{}' is not an integer", fields[i]))
    };
    let float = |i: usize| {
        fields[i]
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", fields[i]))
    };

    Ok(LheParticle {
        id: int(0)?,
        status: int(1)?,
        momentum: FourMomentum::new(
            float(9)? * GEV,
            float(6)? * GEV,
            float(7)? * GEV,
            float(8)? * GEV,
        ),
    })
}

fn extract_vertex(particles: &[LheParticle]) -> Option<VertexRecord> {
    let incoming = particles
        .iter()
        .find(|p| p.status == -1 && matches!(p.id.abs(), 11 | 13))?;
    let outgoing = particles
        .iter()
        .find(|p| p.status == 1 && p.id == incoming.id)?;
    let dark_photon = particles
        .iter()
        .find(|p| p.status == 1 && (p.id == DARK_PHOTON_PDG || p.id == DARK_PHOTON_PDG_ALT))?;

    Some(VertexRecord::from_momenta(
        incoming.momentum.e,
        outgoing.momentum,
        Some(dark_photon.momentum),
    ))
}
