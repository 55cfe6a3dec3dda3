//! Windowing/input collaborator boundary
//!
//! The engine never talks to a window directly. The application polls its
//! windowing layer once per frame and hands the engine an [`InputSnapshot`];
//! camera control and camera switching react to the snapshot.

/// One frame's worth of polled input state
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    /// Move the free camera forward
    pub move_forward: bool,
    /// Move the free camera backward
    pub move_backward: bool,
    /// Strafe the free camera left
    pub move_left: bool,
    /// Strafe the free camera right
    pub move_right: bool,
    /// Move the free camera up
    pub move_up: bool,
    /// Move the free camera down
    pub move_down: bool,

    /// Toggle animation pause this frame
    pub toggle_pause: bool,
    /// Switch to the next scene camera this frame
    pub next_camera: bool,
    /// Switch to the previous scene camera this frame
    pub prev_camera: bool,

    /// Mouse movement since the last poll, in pixels
    pub mouse_delta: (f32, f32),
    /// Scroll wheel movement since the last poll
    pub scroll_delta: f32,
    /// New framebuffer size when the window was resized this frame
    pub resized: Option<(u32, u32)>,
}
