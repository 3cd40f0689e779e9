//! 画面遷移
//!
//! アップロード → 評価 → 結果 の3画面。未サインイン時はランディング画面。

use tracing::debug;

/// サインイン状態の提供元
pub trait IdentityProvider {
    fn is_signed_in(&self) -> bool;

    fn display_name(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Upload,
    Evaluate,
    Export,
}

/// 実際に表示する画面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Upload,
    Evaluate,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEvent {
    /// アップロード完了
    FileProcessed,
    /// 起動時に保存済みプロジェクトを検出
    ProjectDetected,
    /// 「結果を見る」
    ShowResults,
    /// 最後の項目から次へ進んだ
    AdvancedPastEnd,
    /// 新しい評価を始める（ストアのリセットは呼び出し側）
    Reset,
}

#[derive(Debug, Clone, Default)]
pub struct Shell {
    view: View,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    /// 起動時の画面。プロジェクトがあれば評価画面から始める
    pub fn mount(has_project: bool) -> Self {
        let mut shell = Self::new();
        if has_project {
            shell.apply(ShellEvent::ProjectDetected);
        }
        shell
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// イベントを適用して遷移後の画面を返す。該当しない遷移は無視
    pub fn apply(&mut self, event: ShellEvent) -> View {
        let next = match (self.view, event) {
            (View::Upload, ShellEvent::FileProcessed | ShellEvent::ProjectDetected) => View::Evaluate,
            (View::Evaluate, ShellEvent::ShowResults | ShellEvent::AdvancedPastEnd) => View::Export,
            (_, ShellEvent::Reset) => View::Upload,
            (current, _) => {
                debug!(?current, ?event, "ignored view event");
                current
            }
        };
        if next != self.view {
            debug!(from = ?self.view, to = ?next, "view changed");
            self.view = next;
        }
        next
    }

    pub fn screen(&self, identity: &dyn IdentityProvider) -> Screen {
        if !identity.is_signed_in() {
            return Screen::Landing;
        }
        match self.view {
            View::Upload => Screen::Upload,
            View::Evaluate => Screen::Evaluate,
            View::Export => Screen::Export,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(bool);

    impl IdentityProvider for Fixed {
        fn is_signed_in(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_full_cycle() {
        let mut shell = Shell::new();
        assert_eq!(shell.view(), View::Upload);
        assert_eq!(shell.apply(ShellEvent::FileProcessed), View::Evaluate);
        assert_eq!(shell.apply(ShellEvent::AdvancedPastEnd), View::Export);
        assert_eq!(shell.apply(ShellEvent::Reset), View::Upload);
    }

    #[test]
    fn test_mount_with_project() {
        assert_eq!(Shell::mount(true).view(), View::Evaluate);
        assert_eq!(Shell::mount(false).view(), View::Upload);
    }

    #[test]
    fn test_invalid_transitions_ignored() {
        let mut shell = Shell::new();
        assert_eq!(shell.apply(ShellEvent::ShowResults), View::Upload);

        shell.apply(ShellEvent::FileProcessed);
        assert_eq!(shell.apply(ShellEvent::FileProcessed), View::Evaluate);
        assert_eq!(shell.apply(ShellEvent::ShowResults), View::Export);
        assert_eq!(shell.apply(ShellEvent::ProjectDetected), View::Export);
    }

    #[test]
    fn test_signed_out_sees_landing() {
        let mut shell = Shell::new();
        shell.apply(ShellEvent::FileProcessed);
        assert_eq!(shell.screen(&Fixed(false)), Screen::Landing);
        assert_eq!(shell.screen(&Fixed(true)), Screen::Evaluate);
    }
}
