use std::{sync::Arc, time::Instant};

use super::*;
use crate::runtime::clock::ManualClock;

struct Host {
    sampler: SmilSampler,
    samples: Vec<i64>,
}

impl SampleHost for Host {
    fn sampler(&mut self) -> &mut SmilSampler {
        &mut self.sampler
    }

    fn sample_at(&mut self, doc_time: i64) -> SmilResult<()> {
        self.samples.push(doc_time);
        Ok(())
    }
}

fn setup() -> (UpdateQueue<Host>, Animator<Host>, ManualClock) {
    let clock = ManualClock::new(0);
    let host = Host {
        sampler: SmilSampler::new(Arc::new(clock.clone())),
        samples: Vec::new(),
    };
    let queue = UpdateQueue::start("animator-test", host, None).unwrap();
    queue.resume().unwrap();
    let animator = Animator::new(queue.clone(), Duration::from_millis(1)).unwrap();
    (queue, animator, clock)
}

fn wait_for_samples(queue: &UpdateQueue<Host>, from: usize) -> Vec<i64> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let samples = queue
            .invoke_and_wait(move |h: &mut Host| h.samples[from.min(h.samples.len())..].to_vec())
            .unwrap();
        if samples.len() >= 2 {
            return samples;
        }
        assert!(Instant::now() < deadline, "sampler never ticked");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn sample_count(queue: &UpdateQueue<Host>) -> usize {
    queue.invoke_and_wait(|h: &mut Host| h.samples.len()).unwrap()
}

#[test]
fn pause_then_play_resumes_at_the_paused_time() {
    let (queue, animator, clock) = setup();
    animator.play().unwrap();
    assert_eq!(animator.state(), AnimatorState::Playing);
    wait_for_samples(&queue, 0);

    clock.set(300);
    let from = sample_count(&queue);
    assert!(wait_for_samples(&queue, from).contains(&300));

    animator.pause().unwrap();
    assert_eq!(animator.state(), AnimatorState::Paused);
    let paused_at = queue
        .invoke_and_wait(|h: &mut Host| h.sampler.current_time())
        .unwrap();
    assert_eq!(paused_at, 300);

    clock.set(5_000);
    let from = sample_count(&queue);
    animator.play().unwrap();
    let resumed = wait_for_samples(&queue, from);
    assert!(resumed.iter().all(|t| *t == 300), "{resumed:?}");

    animator.stop().unwrap();
    assert_eq!(animator.state(), AnimatorState::Stopped);
    let rewound = queue
        .invoke_and_wait(|h: &mut Host| h.sampler.current_time())
        .unwrap();
    assert_eq!(rewound, 0);
    queue.shutdown();
}

#[test]
fn frame_interval_changes_keep_a_single_timer() {
    let (queue, animator, _clock) = setup();
    assert!(animator.set_frame_interval(Duration::ZERO).is_err());
    animator.play().unwrap();
    animator.set_frame_interval(Duration::from_secs(3600)).unwrap();
    assert_eq!(animator.frame_interval(), Duration::from_secs(3600));
    let n = sample_count(&queue);
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(sample_count(&queue), n);

    animator.set_time_increment(Some(40)).unwrap();
    let inc = queue
        .invoke_and_wait(|h: &mut Host| h.sampler.time_increment())
        .unwrap();
    assert_eq!(inc, Some(40));
    animator.stop().unwrap();
    queue.shutdown();
}
