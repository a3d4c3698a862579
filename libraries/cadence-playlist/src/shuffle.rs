//! Shuffle algorithms for playlist randomization
//!
//! Implements both pure random (Fisher-Yates) and smart shuffle algorithms.
//! Only the entries after the current song are shuffled; the song that is
//! playing stays where it is.

use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::HashMap;

use crate::types::{ShuffleMode, Track};

/// Shuffle a run of tracks in place
pub fn shuffle_tracks(tracks: &mut [Track], mode: ShuffleMode) {
    match mode {
        ShuffleMode::Off => {}
        ShuffleMode::Random => shuffle_random(tracks),
        ShuffleMode::Smart => shuffle_smart(tracks),
    }
}

fn shuffle_random(tracks: &mut [Track]) {
    tracks.shuffle(&mut thread_rng());
}

/// Smart shuffle
///
/// Groups tracks by artist, shuffles within each group and the group order,
/// then deals round-robin so the same artist rarely plays twice in a row.
fn shuffle_smart(tracks: &mut [Track]) {
    if tracks.len() <= 2 {
        shuffle_random(tracks);
        return;
    }

    let mut rng = thread_rng();

    let mut groups: Vec<Vec<Track>> = Vec::new();
    {
        let mut group_of: HashMap<&str, usize> = HashMap::new();
        for track in tracks.iter() {
            let slot = *group_of.entry(track.artist.as_str()).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(track.clone());
        }
    }

    for group in &mut groups {
        group.shuffle(&mut rng);
    }
    groups.shuffle(&mut rng);

    let mut dealt = Vec::with_capacity(tracks.len());
    let mut round = 0;
    while dealt.len() < tracks.len() {
        for group in &groups {
            if let Some(track) = group.get(round) {
                dealt.push(track.clone());
            }
        }
        round += 1;
    }

    for (slot, track) in tracks.iter_mut().zip(dealt) {
        *slot = track;
    }
}
