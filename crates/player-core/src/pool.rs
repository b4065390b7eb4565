//! The fixed-size frame pool: a free list (LIFO-ish push-head/pop-tail)
//! and an ordered display FIFO, both intrusive doubly-linked lists over
//! a never-resized frame array, with counting-semaphore back-pressure.
//!
//! # Invariants
//!
//! - `refs == 0` iff the frame is on the free list or uninitialised.
//! - A frame is on at most one of {free list, display FIFO}.
//! - `pool_size - free_sem.value()` equals the number of frames checked
//!   out (with the decoder, queued for display, or currently showing).
//!
//! List bookkeeping (the intrusive `next`/`prev` links) lives in
//! [`LinkedList`], guarded by the same lock as the rest of that list's
//! structural state. This brings the head/tail writes under the lock
//! rather than leaving them lock-free, since more than one producer can
//! touch a list here; observable ordering is unchanged.

use crate::frame::Frame;
use crate::sync::Semaphore;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

/// An intrusive doubly-linked list over indices `0..size`, supporting
/// push-to-head and pop-from-tail: the shape both the free list and
/// the display FIFO need.
struct LinkedList {
    head: Option<usize>,
    tail: Option<usize>,
    count: usize,
    next: Vec<Option<usize>>,
    prev: Vec<Option<usize>>,
}

impl LinkedList {
    fn empty(size: usize) -> Self {
        Self {
            head: None,
            tail: None,
            count: 0,
            next: vec![None; size],
            prev: vec![None; size],
        }
    }

    fn push_head(&mut self, idx: usize) {
        self.next[idx] = None;
        self.prev[idx] = self.head;
        if let Some(h) = self.head {
            self.next[h] = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
        self.count += 1;
    }

    fn pop_tail(&mut self) -> Option<usize> {
        let t = self.tail?;
        let new_tail = self.next[t];
        if let Some(nt) = new_tail {
            self.prev[nt] = None;
        } else {
            self.head = None;
        }
        self.tail = new_tail;
        self.next[t] = None;
        self.count -= 1;
        Some(t)
    }
}

/// The frame pool and its two queues.
pub struct Pool {
    frames: Vec<Mutex<Frame>>,
    free: Mutex<LinkedList>,
    free_sem: Semaphore,
    display: Mutex<LinkedList>,
    disp_sem: Semaphore,
    next_frame_num: AtomicU64,
    pool_size: usize,
}

impl Pool {
    /// Builds the pool from freshly allocated frames, linking every
    /// frame onto the free list and initialising the free semaphore to
    /// `pool_size - 1` (one slot reserved, so the first acquisition
    /// never spuriously blocks on a not-yet-settled count).
    ///
    /// Every frame's `pic_num` is set to `-(pool_size as i64)`, a
    /// sentinel no real decode serial number can produce.
    #[must_use]
    pub fn new(mut frames: Vec<Frame>) -> Self {
        let pool_size = frames.len();
        let sentinel = -(pool_size as i64);

        let mut free = LinkedList::empty(pool_size);
        for (i, f) in frames.iter_mut().enumerate() {
            f.pic_num = sentinel;
            free.push_head(i);
        }

        Self {
            frames: frames.into_iter().map(Mutex::new).collect(),
            free: Mutex::new(free),
            free_sem: Semaphore::new(pool_size.saturating_sub(1)),
            display: Mutex::new(LinkedList::empty(pool_size)),
            disp_sem: Semaphore::new(0),
            next_frame_num: AtomicU64::new(0),
            pool_size,
        }
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Locks and returns frame `idx`. Valid for `idx` in `0..pool_size`.
    pub fn frame(&self, idx: usize) -> MutexGuard<'_, Frame> {
        self.frames[idx].lock()
    }

    /// Current free-semaphore count, for the display scheduler's warmup
    /// poll. Racy by design (diagnostic use only).
    #[must_use]
    pub fn free_sem_value(&self) -> usize {
        self.free_sem.value()
    }

    /// Number of frames currently queued for display.
    #[must_use]
    pub fn display_len(&self) -> usize {
        self.display.lock().count
    }

    /// Posts the display semaphore without enqueueing anything, to wake
    /// a scheduler blocked in [`Pool::wait_and_pop_display`] for
    /// cancellation. The scheduler must distinguish this from a real
    /// post by checking its own stop flag.
    pub fn cancel_display_wait(&self) {
        self.disp_sem.post();
    }

    /// Blocks until the free list is non-empty, then checks out its
    /// tail frame: bumps `refs` to 1, assigns a fresh `frame_num`, and
    /// returns its index.
    pub fn get_frame(&self) -> usize {
        self.free_sem.wait();

        let idx = {
            let mut free = self.free.lock();
            match free.pop_tail() {
                Some(idx) => idx,
                None => {
                    // The semaphore said a frame was available; an empty
                    // list here means the free-count/free-list invariant
                    // was violated elsewhere.
                    error!("no more buffers");
                    return usize::MAX;
                }
            }
        };

        let mut f = self.frames[idx].lock();
        f.refs += 1;
        f.frame_num = self.next_frame_num.fetch_add(1, Ordering::Relaxed);
        idx
    }

    /// Releases one reference on frame `idx`. When the count reaches
    /// zero, the frame returns to the free list and the free semaphore
    /// is posted.
    pub fn put_frame(&self, idx: usize) {
        let now_free = {
            let mut f = self.frames[idx].lock();
            f.refs -= 1;
            f.refs == 0
        };

        if now_free {
            self.free.lock().push_head(idx);
            self.free_sem.post();
        }
    }

    /// Appends frame `idx` to the display FIFO, bumps its reference
    /// count, and unconditionally posts the display semaphore. An
    /// earlier design posted only once the queue held more than one
    /// frame, which would strand the first frame of every run; that
    /// guard is not replicated here.
    pub fn post_frame(&self, idx: usize) {
        self.frames[idx].lock().refs += 1;
        self.display.lock().push_head(idx);
        self.disp_sem.post();
    }

    /// Blocks until the display semaphore is posted, then pops the
    /// FIFO's tail. Returns `None` when woken by
    /// [`Pool::cancel_display_wait`] with nothing queued (the caller
    /// must check its own stop flag to tell this apart from a spurious
    /// empty queue).
    pub fn wait_and_pop_display(&self) -> Option<usize> {
        self.disp_sem.wait();
        self.display.lock().pop_tail()
    }

    /// Drains every frame still on the display FIFO back to the free
    /// list, releasing one reference each. Used during shutdown.
    pub fn drain_display(&self) {
        loop {
            let idx = self.display.lock().pop_tail();
            match idx {
                Some(idx) => self.put_frame(idx),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn make_pool(size: usize) -> Pool {
        let frames = (0..size)
            .map(|i| Frame::new(i, [4, 2, 2], [16, 4, 4]))
            .collect();
        Pool::new(frames)
    }

    #[test]
    fn test_init_free_sem_is_pool_size_minus_one() {
        let pool = make_pool(4);
        assert_eq!(pool.free_sem_value(), 3);
    }

    #[test]
    fn test_init_pic_num_sentinel() {
        let pool = make_pool(3);
        let idx = pool.get_frame();
        assert_eq!(pool.frame(idx).pic_num, -3);
    }

    #[test]
    fn test_get_put_round_trip_restores_sem() {
        let pool = make_pool(2);
        let before = pool.free_sem_value();
        let idx = pool.get_frame();
        assert_eq!(pool.frame(idx).refs, 1);
        pool.put_frame(idx);
        assert_eq!(pool.frame(idx).refs, 0);
        assert_eq!(pool.free_sem_value(), before);
    }

    #[test]
    fn test_post_then_pop_is_fifo() {
        let pool = make_pool(4);
        let a = pool.get_frame();
        let b = pool.get_frame();
        pool.post_frame(a);
        pool.post_frame(b);

        let first = pool.wait_and_pop_display().expect("a queued");
        assert_eq!(first, a, "FIFO order: a was posted first");
        let second = pool.wait_and_pop_display().expect("b queued");
        assert_eq!(second, b);
    }

    #[test]
    fn test_post_frame_posts_sem_on_every_enqueue() {
        // The first posted frame must be immediately visible to the
        // display thread; a `queue_len > 1` guard would stall it.
        let pool = make_pool(2);
        let a = pool.get_frame();
        pool.post_frame(a);
        let got = pool.wait_and_pop_display();
        assert_eq!(got, Some(a));
    }

    #[test]
    fn test_post_frame_bumps_refs_for_dual_ownership() {
        // A frame referenced as both a decode anchor and queued for
        // display should have refs >= 2.
        let pool = make_pool(2);
        let idx = pool.get_frame(); // refs = 1 (decoder checkout)
        pool.post_frame(idx); // refs = 2 (also queued for display)
        assert_eq!(pool.frame(idx).refs, 2);
    }

    #[test]
    fn test_get_frame_blocks_until_put_frame() {
        use std::sync::Arc;
        use std::time::Duration;

        let pool = Arc::new(make_pool(1));
        // Consume the one reserved slot (sem starts at pool_size - 1 = 0),
        // so the pool begins fully checked out.
        let first = pool.get_frame();
        assert_eq!(pool.free_sem_value(), 0);

        let pool2 = pool.clone();
        let handle = std::thread::spawn(move || pool2.get_frame());

        std::thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());

        pool.put_frame(first);
        let second = handle.join().expect("getter thread panicked");
        assert_eq!(second, first, "only one frame exists in this pool");
    }

    #[test]
    fn test_drain_display_releases_all_queued_frames() {
        let pool = make_pool(3);
        let a = pool.get_frame();
        let b = pool.get_frame();
        pool.post_frame(a);
        pool.post_frame(b);

        pool.drain_display();

        assert_eq!(pool.display_len(), 0);
        assert_eq!(pool.frame(a).refs, 0);
        assert_eq!(pool.frame(b).refs, 0);
    }
}
