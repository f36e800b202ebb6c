use std::sync::Arc;
use std::time::Duration;

use super::*;

fn canvas() -> Canvas {
    Canvas {
        width: 4,
        height: 4,
    }
}

#[test]
fn guards_return_surfaces_on_drop() {
    let pool = SurfacePool::new(2, canvas()).unwrap();
    assert_eq!(pool.capacity(), 2);
    let a = pool.acquire();
    let b = pool.acquire();
    assert_ne!(a.id(), b.id());
    assert_eq!(pool.available(), 0);
    drop(a);
    assert_eq!(pool.available(), 1);
    drop(b);
    assert_eq!(pool.available(), 2);
}

#[test]
fn acquire_blocks_until_a_surface_is_released() {
    let pool = Arc::new(SurfacePool::new(1, canvas()).unwrap());
    let held = pool.acquire();
    let held_id = held.id();

    let waiter = {
        let pool = pool.clone();
        std::thread::spawn(move || pool.acquire().id())
    };
    std::thread::sleep(Duration::from_millis(50));
    assert!(!waiter.is_finished());

    drop(held);
    assert_eq!(waiter.join().unwrap(), held_id);
}

#[test]
fn surfaces_match_canvas_size() {
    let pool = SurfacePool::new(1, canvas()).unwrap();
    let s = pool.acquire();
    assert_eq!((s.pixmap().width(), s.pixmap().height()), (4, 4));
}

#[test]
fn empty_pool_is_rejected() {
    assert!(SurfacePool::new(0, canvas()).is_err());
}
