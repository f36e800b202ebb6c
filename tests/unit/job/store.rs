use super::*;

fn exercise(store: &dyn JobStore) {
    let job = RenderJob::new(Uuid::new_v4());
    let id = job.id;
    store.insert(job).unwrap();

    store.advance(id, JobStage::AudioDownload).unwrap();
    store.advance(id, JobStage::Frames).unwrap();
    store
        .update(id, &mut |j| {
            j.num_frames = Some(10);
            Ok(())
        })
        .unwrap();
    store.record_frames(id, 4).unwrap();
    store.record_frames(id, 2).unwrap();

    let got = store.get(id).unwrap().unwrap();
    assert_eq!(got.status, JobStage::Frames);
    assert_eq!(got.frames_complete, 4);

    // Illegal transitions leave the stored job unchanged.
    assert!(store.advance(id, JobStage::Trim).is_err());
    assert_eq!(store.get(id).unwrap().unwrap().status, JobStage::Frames);

    assert!(store.fail(id, "nope").unwrap());
    assert!(!store.fail(id, "twice").unwrap());
    let got = store.get(id).unwrap().unwrap();
    assert_eq!(got.status, JobStage::Error);
    assert_eq!(got.error.as_deref(), Some("nope"));

    assert!(store.get(Uuid::new_v4()).unwrap().is_none());
    assert!(store.advance(Uuid::new_v4(), JobStage::Trim).is_err());
}

#[test]
fn memory_store_tracks_transitions() {
    exercise(&MemoryJobStore::new());
}

#[test]
fn file_store_tracks_transitions() {
    let dir = tempfile::tempdir().unwrap();
    exercise(&FileJobStore::open(dir.path().join("jobs")).unwrap());
}

#[test]
fn file_store_is_readable_by_another_instance() {
    let dir = tempfile::tempdir().unwrap();
    let writer = FileJobStore::open(dir.path()).unwrap();
    let job = RenderJob::new(Uuid::new_v4());
    let id = job.id;
    writer.insert(job).unwrap();
    writer.advance(id, JobStage::Waveform).unwrap();

    let reader = FileJobStore::open(dir.path()).unwrap();
    assert_eq!(reader.get(id).unwrap().unwrap().status, JobStage::Waveform);
    assert!(dir.path().join(format!("{id}.json")).is_file());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
