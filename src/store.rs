//! Append-mostly store of tracks keyed by stable integer identifiers.
//!
//! Each track holds a dense series of per-frame data records between its
//! first and last frame; frames the track was not updated on carry a null
//! record. Identifiers are allocated from a monotonically increasing
//! counter and never reused, so lookup by id is a vector index.

use crate::detection::Detection;
use crate::metadata::Metadata;

/// Stable track identifier: a positive integer, unique per store and
/// never reused.
pub type TrackId = u32;

/// Frame index: a positive integer, nondecreasing over a session.
pub type FrameIndex = u32;

/// Errors that can occur while editing the track store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The track id does not exist in this store.
    #[error("Track {0} does not exist.")]
    UnknownTrack(TrackId),
    /// The appended frame does not extend the track.
    #[error("Frame {frame} does not extend track {track} (last frame {last}).")]
    NonMonotonicFrame {
        /// The offending track.
        track: TrackId,
        /// The frame that was appended.
        frame: FrameIndex,
        /// The track's current last frame.
        last: FrameIndex,
    },
    /// The track has no frames left to delete.
    #[error("Track {0} is empty.")]
    EmptyTrack(TrackId),
}

/// One tracked object: a dense per-frame history plus lineage links.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: TrackId,
    first_frame: FrameIndex,
    data: Vec<Option<Detection>>,
    mother_id: Option<TrackId>,
    daughter_ids: Option<(TrackId, TrackId)>,
}

impl Track {
    fn new(id: TrackId, frame: FrameIndex, data: Detection) -> Self {
        Track { id, first_frame: frame, data: vec![Some(data)], mother_id: None, daughter_ids: None }
    }

    /// The stable identifier of this track.
    #[must_use]
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// The first frame of the track, or `None` for an empty track.
    #[must_use]
    pub fn first_frame(&self) -> Option<FrameIndex> {
        if self.data.is_empty() { None } else { Some(self.first_frame) }
    }

    /// The last frame of the track, or `None` for an empty track.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn last_frame(&self) -> Option<FrameIndex> {
        if self.data.is_empty() {
            None
        } else {
            Some(self.first_frame + (self.data.len() as FrameIndex) - 1)
        }
    }

    /// Number of frame slots in the series, null records included.
    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.data.len()
    }

    /// The parent track, when this track is a daughter.
    #[must_use]
    pub fn mother_id(&self) -> Option<TrackId> {
        self.mother_id
    }

    /// The two daughter tracks, when this track has divided.
    #[must_use]
    pub fn daughter_ids(&self) -> Option<(TrackId, TrackId)> {
        self.daughter_ids
    }

    /// The record at an absolute frame index, `None` when the frame is
    /// outside the track's bounds or holds a null record.
    #[must_use]
    pub fn data_at_frame(&self, frame: FrameIndex) -> Option<&Detection> {
        if self.data.is_empty() || frame < self.first_frame {
            return None;
        }
        self.data.get((frame - self.first_frame) as usize).and_then(Option::as_ref)
    }

    /// The record at the last frame, `None` when the track is empty or
    /// the last slot holds a null record.
    #[must_use]
    pub fn last_data(&self) -> Option<&Detection> {
        self.data.last().and_then(Option::as_ref)
    }

    /// The record at a non-positive offset from the last frame: `0` is
    /// the last frame, `-1` the one before, and so on.
    #[must_use]
    pub fn data_at_offset(&self, offset: i64) -> Option<&Detection> {
        debug_assert!(offset <= 0, "We expected a non-positive frame offset");
        let index = self.data.len() as i64 - 1 + offset;
        let index = usize::try_from(index).ok()?;
        self.data.get(index).and_then(Option::as_ref)
    }

    /// Iterates over `(frame, record)` pairs for every slot of the
    /// series, null records included.
    #[allow(clippy::cast_possible_truncation)]
    pub fn frames(&self) -> impl Iterator<Item = (FrameIndex, Option<&Detection>)> {
        self.data
            .iter()
            .enumerate()
            .map(|(offset, record)| (self.first_frame + offset as FrameIndex, record.as_ref()))
    }
}

/// The track container: tracks in allocation order, session metadata, and
/// the attribute schema negotiated from the first stored detection.
#[derive(Debug, Clone, Default)]
pub struct TrackStore {
    tracks: Vec<Track>,
    metadata: Metadata,
    schema: Vec<String>,
}

impl TrackStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracks ever created in this store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Returns true when no track has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// The attribute column order for export, negotiated from the first
    /// detection ever stored.
    #[must_use]
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    /// Read access to the session metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Write access to the session metadata.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Returns the track with the given id, if it exists.
    #[must_use]
    pub fn get(&self, id: TrackId) -> Option<&Track> {
        if id == 0 {
            return None;
        }
        self.tracks.get((id - 1) as usize)
    }

    fn get_mut(&mut self, id: TrackId) -> Result<&mut Track, StoreError> {
        if id == 0 {
            return Err(StoreError::UnknownTrack(id));
        }
        self.tracks.get_mut((id - 1) as usize).ok_or(StoreError::UnknownTrack(id))
    }

    /// Iterates over all tracks in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    /// Creates a new track starting at `frame` with `data` as its first
    /// record, and returns its freshly allocated id.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_track(&mut self, frame: FrameIndex, data: Detection) -> TrackId {
        if self.schema.is_empty() {
            self.schema = data.names().map(str::to_owned).collect();
        }
        let id = self.tracks.len() as TrackId + 1;
        self.tracks.push(Track::new(id, frame, data));
        id
    }

    /// Appends a record at a new frame, padding any skipped frames with
    /// null records.
    ///
    /// # Errors
    ///
    /// Returns an error when the track does not exist or `frame` does not
    /// lie strictly beyond the track's last frame.
    pub fn append_frame(
        &mut self,
        id: TrackId,
        frame: FrameIndex,
        data: Detection,
    ) -> Result<(), StoreError> {
        let track = self.get_mut(id)?;
        let Some(last) = track.last_frame() else {
            // An emptied track restarts at the appended frame.
            track.first_frame = frame;
            track.data.push(Some(data));
            return Ok(());
        };
        if frame <= last {
            return Err(StoreError::NonMonotonicFrame { track: id, frame, last });
        }
        for _ in last + 1..frame {
            track.data.push(None);
        }
        track.data.push(Some(data));
        Ok(())
    }

    /// Removes the record at the track's last frame, shrinking the series
    /// by exactly one slot.
    ///
    /// # Errors
    ///
    /// Returns an error when the track does not exist or is already
    /// empty.
    pub fn delete_last_frame(&mut self, id: TrackId) -> Result<(), StoreError> {
        let track = self.get_mut(id)?;
        if track.data.pop().is_none() {
            return Err(StoreError::EmptyTrack(id));
        }
        Ok(())
    }

    /// Links a track to its parent.
    ///
    /// # Errors
    ///
    /// Returns an error when either track does not exist.
    pub fn set_mother(&mut self, id: TrackId, mother_id: TrackId) -> Result<(), StoreError> {
        if self.get(mother_id).is_none() {
            return Err(StoreError::UnknownTrack(mother_id));
        }
        self.get_mut(id)?.mother_id = Some(mother_id);
        Ok(())
    }

    /// Records the two daughters of a divided track.
    ///
    /// # Errors
    ///
    /// Returns an error when the track or either daughter does not exist.
    pub fn set_daughters(
        &mut self,
        id: TrackId,
        daughters: (TrackId, TrackId),
    ) -> Result<(), StoreError> {
        if self.get(daughters.0).is_none() {
            return Err(StoreError::UnknownTrack(daughters.0));
        }
        if self.get(daughters.1).is_none() {
            return Err(StoreError::UnknownTrack(daughters.1));
        }
        self.get_mut(id)?.daughter_ids = Some(daughters);
        Ok(())
    }

    /// The record at the track's last frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the track does not exist.
    pub fn get_last_data(&self, id: TrackId) -> Result<Option<&Detection>, StoreError> {
        Ok(self.get(id).ok_or(StoreError::UnknownTrack(id))?.last_data())
    }

    /// The record at a non-positive offset from the track's last frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the track does not exist.
    pub fn get_data_at_offset(
        &self,
        id: TrackId,
        offset: i64,
    ) -> Result<Option<&Detection>, StoreError> {
        Ok(self.get(id).ok_or(StoreError::UnknownTrack(id))?.data_at_offset(offset))
    }
}
