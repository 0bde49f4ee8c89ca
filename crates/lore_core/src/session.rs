//! Session context.
//!
//! Carries who is signed in and in which access mode. Every service that
//! needs session state receives an `Arc<SessionContext>` explicitly;
//! nothing reads ambient globals.

use crate::ids::StudentId;
use parking_lot::RwLock;
use std::time::Duration;
use tokio::sync::watch;

/// How the current user entered the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// A student playing normally. Saving is allowed.
    #[default]
    Student,
    /// A teacher previewing content. Progress must never be written.
    TeacherPreview,
}

impl AccessMode {
    pub fn can_save(&self) -> bool {
        matches!(self, AccessMode::Student)
    }
}

/// Shared sign-in state.
///
/// Sign-in completes at an unpredictable time relative to scene loads, so
/// consumers that need a student wait with a bound instead of polling.
#[derive(Debug)]
pub struct SessionContext {
    student: watch::Sender<Option<StudentId>>,
    mode: RwLock<AccessMode>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (student, _) = watch::channel(None);
        Self {
            student,
            mode: RwLock::new(AccessMode::Student),
        }
    }

    /// Currently signed-in student, if any.
    pub fn active_student(&self) -> Option<StudentId> {
        self.student.borrow().clone()
    }

    /// Marks the student as signed in and wakes bounded waiters.
    pub fn set_active_student(&self, student: StudentId) {
        self.student.send_replace(Some(student));
    }

    /// Clears the sign-in (logout). Services caching per-student state
    /// invalidate on the next access.
    pub fn clear_student(&self) {
        self.student.send_replace(None);
    }

    /// Waits up to `timeout` for a signed-in student.
    ///
    /// Resolves as soon as a student is available, or `None` once the
    /// bound elapses. Callers degrade to defaults instead of hanging.
    pub async fn wait_for_student(&self, timeout: Duration) -> Option<StudentId> {
        if let Some(student) = self.active_student() {
            return Some(student);
        }
        let mut rx = self.student.subscribe();
        let waited = tokio::time::timeout(timeout, async {
            loop {
                if let Some(student) = rx.borrow_and_update().clone() {
                    return Some(student);
                }
                if rx.changed().await.is_err() {
                    return None;
                }
            }
        })
        .await;
        waited.ok().flatten()
    }

    pub fn access_mode(&self) -> AccessMode {
        *self.mode.read()
    }

    pub fn set_access_mode(&self, mode: AccessMode) {
        *self.mode.write() = mode;
    }

    /// False in teacher preview; the save UI shows "cannot save from
    /// here" instead of writing anything.
    pub fn can_save(&self) -> bool {
        self.access_mode().can_save()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wait_returns_immediately_when_signed_in() {
        let session = SessionContext::new();
        session.set_active_student(StudentId::new("s-1"));
        let student = session.wait_for_student(Duration::from_millis(10)).await;
        assert_eq!(student, Some(StudentId::new("s-1")));
    }

    #[tokio::test]
    async fn test_wait_times_out_without_student() {
        let session = SessionContext::new();
        let student = session.wait_for_student(Duration::from_millis(20)).await;
        assert_eq!(student, None);
    }

    #[tokio::test]
    async fn test_wait_wakes_on_late_sign_in() {
        let session = Arc::new(SessionContext::new());
        let background = session.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            background.set_active_student(StudentId::new("s-2"));
        });
        let student = session.wait_for_student(Duration::from_secs(1)).await;
        assert_eq!(student, Some(StudentId::new("s-2")));
    }

    #[tokio::test]
    async fn test_clear_student_invalidates() {
        let session = SessionContext::new();
        session.set_active_student(StudentId::new("s-3"));
        session.clear_student();
        assert_eq!(session.active_student(), None);
    }

    #[test]
    fn test_teacher_preview_cannot_save() {
        let session = SessionContext::new();
        assert!(session.can_save());
        session.set_access_mode(AccessMode::TeacherPreview);
        assert!(!session.can_save());
    }
}
