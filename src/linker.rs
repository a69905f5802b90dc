//! The frame-to-frame track linker: an online state machine that folds
//! each frame's detections into the growing track graph.
//!
//! Each call to [`Linker::assign_to_frame`] is one atomic step: build the
//! block cost matrix, solve the assignment, apply continuations, retire
//! aged-out tracks, and resolve every leftover detection into either a
//! mitosis event or a new track. All store mutations are planned first
//! and applied only after every fallible computation has succeeded, so a
//! failed step leaves the store untouched.

use std::time::Instant;

use log::debug;

use crate::assignment;
use crate::cost_matrix;
use crate::detection::{AttributeValue, Detection};
use crate::errors::LinkerError;
use crate::options::{LinkerOptions, OptionsError};
use crate::scoring::score;
use crate::store::{FrameIndex, TrackId, TrackStore};

/// One entry of the linker's active set.
#[derive(Debug, Clone, Copy)]
struct ActiveTrack {
    id: TrackId,
    /// Consecutive frame steps since the track was last updated.
    age: u32,
    /// Frames between the track's first frame and the last processed
    /// frame. Gates how soon a fresh daughter may divide again.
    age_since_division: u32,
}

impl ActiveTrack {
    fn fresh(id: TrackId) -> Self {
        ActiveTrack { id, age: 0, age_since_division: 0 }
    }
}

/// Planned outcome for one detection of the current frame.
#[derive(Debug, Clone, Copy)]
enum Outcome {
    /// The detection continues an existing track.
    Linked,
    /// The detection opens a standalone track.
    NewTrack,
    /// The detection is the second daughter of the active track at this
    /// pre-retirement index.
    Mitosis {
        /// Index of the parent in the frame's active set.
        parent: usize,
    },
}

/// The online track linker.
///
/// # Examples
///
/// ```
/// use lap_linker::detection::Detection;
/// use lap_linker::linker::Linker;
/// use lap_linker::options::LinkerOptions;
///
/// let mut linker = Linker::new(LinkerOptions::default()).unwrap();
/// let frame_1 = vec![Detection::new().with_vector("centroid", vec![0.0, 0.0])];
/// let frame_2 = vec![Detection::new().with_vector("centroid", vec![1.0, 1.0])];
/// linker.assign_to_frame(1, &frame_1).unwrap();
/// linker.assign_to_frame(2, &frame_2).unwrap();
/// let store = linker.into_store();
/// assert_eq!(store.len(), 1);
/// assert_eq!(store.get(1).unwrap().last_frame(), Some(2));
/// ```
#[derive(Debug)]
pub struct Linker {
    options: LinkerOptions,
    store: TrackStore,
    active: Vec<ActiveTrack>,
    last_frame: Option<FrameIndex>,
}

impl Linker {
    /// Creates a linker with the given options.
    ///
    /// # Errors
    ///
    /// Returns an error when the options fail validation.
    pub fn new(options: LinkerOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        Ok(Linker { options, store: TrackStore::new(), active: Vec::new(), last_frame: None })
    }

    /// The options this linker runs with.
    #[must_use]
    pub fn options(&self) -> &LinkerOptions {
        &self.options
    }

    /// Read access to the track graph built so far.
    #[must_use]
    pub fn snapshot(&self) -> &TrackStore {
        &self.store
    }

    /// Hands off the completed track graph, consuming the linker.
    #[must_use]
    pub fn into_store(self) -> TrackStore {
        self.store
    }

    /// Identifiers of the tracks currently eligible for linking.
    pub fn active_tracks(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.active.iter().map(|entry| entry.id)
    }

    /// Sets the per-frame timestamps and their unit on the store.
    pub fn set_timestamp_info(&mut self, times: Vec<f64>, units: impl Into<String>) {
        self.store.metadata_mut().set_timestamps(times, units);
    }

    /// Sets the physical pixel size on the store.
    pub fn set_pixel_size(&mut self, value: f64, units: impl Into<String>) {
        self.store.metadata_mut().set_pixel_size(value, units);
    }

    /// Sets the image size as `(height, width)` on the store.
    pub fn set_image_size(&mut self, height: u32, width: u32) {
        self.store.metadata_mut().set_image_size(height, width);
    }

    /// Sets the source filename on the store.
    pub fn set_filename(&mut self, name: impl Into<String>) {
        self.store.metadata_mut().set_filename(name);
    }

    /// Folds one frame of detections into the track graph.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame does not advance the linker, a
    /// detection lacks a required attribute, a score cannot be computed,
    /// or the solver rejects the cost matrix. The store is left in its
    /// pre-call state on every error.
    pub fn assign_to_frame(
        &mut self,
        frame: FrameIndex,
        detections: &[Detection],
    ) -> Result<(), LinkerError> {
        self.assign_to_frame_manual(frame, detections, false)
    }

    /// [`assign_to_frame`](Self::assign_to_frame) with standalone
    /// new-track creation suppressed when `no_new_tracks` is set; mitosis
    /// edits still apply.
    ///
    /// # Errors
    ///
    /// As for [`assign_to_frame`](Self::assign_to_frame).
    pub fn assign_to_frame_manual(
        &mut self,
        frame: FrameIndex,
        detections: &[Detection],
        no_new_tracks: bool,
    ) -> Result<(), LinkerError> {
        if frame == 0 {
            return Err(LinkerError::ZeroFrameIndex);
        }
        if let Some(last) = self.last_frame {
            if frame <= last {
                return Err(LinkerError::NonMonotonicFrame { frame, last });
            }
        }

        let m = detections.len();

        // Cold start: the very first detections each open a track.
        if self.store.is_empty() {
            if !no_new_tracks {
                for detection in detections {
                    let id = self.store.add_track(frame, detection.clone());
                    self.active.push(ActiveTrack::fresh(id));
                }
            }
            self.last_frame = Some(frame);
            debug!("frame {frame}: cold start with {} tracks", self.active.len());
            return Ok(());
        }

        // Degenerate frames: nothing detected, or nothing to link
        // against. Age the active set and open tracks as needed; the
        // solver never runs.
        if m == 0 || self.active.is_empty() {
            let frame_step = frame - self.last_frame.unwrap_or(frame);
            self.age_and_retire(frame_step);
            if !no_new_tracks {
                for detection in detections {
                    let id = self.store.add_track(frame, detection.clone());
                    self.active.push(ActiveTrack::fresh(id));
                }
            }
            self.last_frame = Some(frame);
            debug!("frame {frame}: no assignment needed, {} active tracks", self.active.len());
            return Ok(());
        }

        let options = self.options.clone();
        let n = self.active.len();
        let frame_step = frame - self.last_frame.unwrap_or(frame);
        let started = Instant::now();

        // Attribute validation up front keeps every failure ahead of the
        // first store mutation.
        let mut detection_links: Vec<&AttributeValue> = Vec::with_capacity(m);
        for (index, detection) in detections.iter().enumerate() {
            let value = detection.get(&options.linked_by).ok_or_else(|| {
                LinkerError::MissingAttribute { index, attribute: options.linked_by.clone() }
            })?;
            detection_links.push(value);
        }
        if options.track_mitosis {
            for (index, detection) in detections.iter().enumerate() {
                if detection.get(&options.mitosis_param).is_none() {
                    return Err(LinkerError::MissingAttribute {
                        index,
                        attribute: options.mitosis_param.clone(),
                    });
                }
            }
        }

        let track_links: Vec<Option<&AttributeValue>> = self
            .active
            .iter()
            .map(|entry| {
                self.store
                    .get(entry.id)
                    .and_then(|track| track.last_data())
                    .and_then(|data| data.get(&options.linked_by))
            })
            .collect();

        let costs = cost_matrix::build(&track_links, &detection_links, &options)?;
        let solve_started = Instant::now();
        let solved = assignment::solve(&costs, options.lap_solver)?;
        let solve_elapsed = solve_started.elapsed();

        // Plan continuations: active row i keeps detection column j.
        let mut continuation: Vec<Option<usize>> = vec![None; n];
        let mut detection_taken = vec![false; m];
        for (i, slot) in continuation.iter_mut().enumerate() {
            if let Some(j) = solved.row_to_column[i] {
                if j < m {
                    *slot = Some(j);
                    detection_taken[j] = true;
                }
            }
        }
        let updated_ages: Vec<u32> = (0..n)
            .map(|i| if continuation[i].is_some() { 0 } else { self.active[i].age + 1 })
            .collect();
        // Per-entry frames-since-division as of this frame; for a
        // daughter this equals the frame distance to its first frame.
        let divided_ages: Vec<u32> = self
            .active
            .iter()
            .map(|entry| entry.age_since_division.saturating_add(frame_step))
            .collect();

        // Plan outcomes for the leftover detections, electing mitosis
        // parents among the tracks that survive retirement.
        let mut outcomes: Vec<Outcome> = Vec::with_capacity(m);
        let mut consumed = vec![false; n];
        let mut mitoses = 0;
        for j in 0..m {
            if detection_taken[j] {
                outcomes.push(Outcome::Linked);
                continue;
            }
            let parent = if options.track_mitosis {
                self.elect_mitosis_parent(
                    &detections[j],
                    j,
                    &updated_ages,
                    &divided_ages,
                    &consumed,
                    &options,
                )?
            } else {
                None
            };
            if let Some(parent) = parent {
                consumed[parent] = true;
                mitoses += 1;
                outcomes.push(Outcome::Mitosis { parent });
            } else {
                outcomes.push(Outcome::NewTrack);
            }
        }

        // Everything fallible has run; apply the plan.
        for i in 0..n {
            if let Some(j) = continuation[i] {
                self.store.append_frame(self.active[i].id, frame, detections[j].clone())?;
            }
            self.active[i].age = updated_ages[i];
            self.active[i].age_since_division = divided_ages[i];
        }

        let mut dropped = vec![false; n];
        for (i, slot) in dropped.iter_mut().enumerate() {
            *slot = updated_ages[i] >= options.max_track_age;
        }

        let mut new_entries: Vec<ActiveTrack> = Vec::new();
        for (j, outcome) in outcomes.iter().enumerate() {
            match outcome {
                Outcome::Linked => {}
                Outcome::NewTrack => {
                    if !no_new_tracks {
                        let id = self.store.add_track(frame, detections[j].clone());
                        new_entries.push(ActiveTrack::fresh(id));
                    }
                }
                Outcome::Mitosis { parent } => {
                    let parent_id = self.active[*parent].id;
                    // The record just linked to the parent becomes the
                    // first daughter; the leftover detection the second.
                    let Some(first_daughter_data) = self.store.get_last_data(parent_id)?.cloned()
                    else {
                        unreachable!("We expected the dividing parent to carry this frame's record");
                    };
                    let d1 = self.store.add_track(frame, first_daughter_data);
                    let d2 = self.store.add_track(frame, detections[j].clone());
                    self.store.set_mother(d1, parent_id)?;
                    self.store.set_mother(d2, parent_id)?;
                    self.store.delete_last_frame(parent_id)?;
                    self.store.set_daughters(parent_id, (d1, d2))?;
                    dropped[*parent] = true;
                    new_entries.push(ActiveTrack::fresh(d1));
                    new_entries.push(ActiveTrack::fresh(d2));
                }
            }
        }

        let mut survivors = Vec::with_capacity(n + new_entries.len());
        for (i, entry) in self.active.iter().enumerate() {
            if !dropped[i] {
                survivors.push(*entry);
            }
        }
        survivors.extend(new_entries);
        self.active = survivors;
        self.last_frame = Some(frame);

        debug!(
            "frame {frame}: {n}x{m} linking block, {} solve in {:?}, {mitoses} mitoses, step in {:?}",
            options.lap_solver,
            solve_elapsed,
            started.elapsed(),
        );
        Ok(())
    }

    /// Ages every active entry by one step and drops the entries that
    /// reached the maximum track age; their records stay in the store.
    fn age_and_retire(&mut self, frame_step: u32) {
        for entry in &mut self.active {
            entry.age += 1;
            entry.age_since_division = entry.age_since_division.saturating_add(frame_step);
        }
        let max_track_age = self.options.max_track_age;
        self.active.retain(|entry| entry.age < max_track_age);
    }

    /// Scores one leftover detection against every eligible parent and
    /// returns the index of the best one, if any candidate survives the
    /// mitosis gate.
    ///
    /// Eligibility follows the stored series as it stands before this
    /// frame's edits: the reference record sits `mitosis_link_to_frame`
    /// slots before the parent's last stored frame. `divided_ages[i]` is
    /// the candidate's frames since division as of this frame, taken
    /// from its active-set entry.
    fn elect_mitosis_parent(
        &self,
        detection: &Detection,
        detection_index: usize,
        updated_ages: &[u32],
        divided_ages: &[u32],
        consumed: &[bool],
        options: &LinkerOptions,
    ) -> Result<Option<usize>, LinkerError> {
        let detection_value = detection.get(&options.mitosis_param).ok_or_else(|| {
            LinkerError::MissingAttribute {
                index: detection_index,
                attribute: options.mitosis_param.clone(),
            }
        })?;
        let (lo, hi) = options.mitosis_score_range;

        let mut best: Option<(f64, usize)> = None;
        for (i, entry) in self.active.iter().enumerate() {
            // Only tracks updated this frame, still active after
            // retirement, and not already consumed by another division.
            if consumed[i] || updated_ages[i] != 0 {
                continue;
            }
            let Some(track) = self.store.get(entry.id) else {
                continue;
            };
            // A fresh daughter cannot divide again right away.
            if track.mother_id().is_some() && divided_ages[i] < options.min_age_since_mitosis {
                continue;
            }
            // No valid reference frame that far back.
            let num_frames = track.num_frames() as i64;
            if num_frames + options.mitosis_link_to_frame < 1 {
                continue;
            }
            let Some(reference) = track
                .data_at_offset(options.mitosis_link_to_frame)
                .and_then(|record| record.get(&options.mitosis_param))
            else {
                continue;
            };
            let value = score(detection_value, reference, options.mitosis_calc)?;
            if value < lo || value > hi {
                continue;
            }
            if best.is_none_or(|(best_value, _)| value < best_value) {
                best = Some((value, i));
            }
        }
        Ok(best.map(|(_, index)| index))
    }
}
