use hrl_core::{ButtonSource, HrlResult, Input, Key, KeyMap};
use hrl_timing::Timer;
use std::time::Duration;

/// Blocking button reader: raw codes from `S`, labels from `M`.
#[derive(Debug)]
pub struct ButtonReader<S, M> {
    source: S,
    keymap: M,
}

impl<S: ButtonSource, M: KeyMap> ButtonReader<S, M> {
    pub fn new(source: S, keymap: M) -> Self {
        Self { source, keymap }
    }
}

impl<S: ButtonSource, M: KeyMap> Input for ButtonReader<S, M> {
    fn read_button(
        &mut self,
        allowed: &[Key],
        timeout: Duration,
    ) -> HrlResult<(Option<Key>, Duration)> {
        let mut spent = Duration::ZERO;
        loop {
            let remaining = timeout.saturating_sub(spent);
            if remaining.is_zero() {
                return Ok((None, timeout));
            }
            let Some((code, elapsed)) = self.source.wait_button(remaining)? else {
                return Ok((None, timeout));
            };
            let key = self.keymap.translate(code)?;
            spent += elapsed;
            if allowed.is_empty() || allowed.contains(&key) {
                tracing::debug!(%key, ?spent, "button accepted");
                return Ok((Some(key), spent));
            }
            tracing::debug!(%key, ?elapsed, "button not in allowed set, waiting again");
        }
    }
}

/// A device that can only report which button is down right now.
pub trait ButtonPoll {
    fn poll(&mut self) -> HrlResult<Option<u32>>;
}

/// Turns a [`ButtonPoll`] device into a blocking [`ButtonSource`] by
/// sampling it every `interval` until a press shows up or time runs out.
#[derive(Debug)]
pub struct PollingButtons<P, T> {
    device: P,
    timer: T,
    interval: Duration,
}

impl<P: ButtonPoll, T: Timer> PollingButtons<P, T> {
    pub fn new(device: P, timer: T, interval: Duration) -> Self {
        Self {
            device,
            timer,
            interval,
        }
    }
}

impl<P: ButtonPoll, T: Timer> ButtonSource for PollingButtons<P, T> {
    fn wait_button(&mut self, timeout: Duration) -> HrlResult<Option<(u32, Duration)>> {
        let start = self.timer.now();
        loop {
            if let Some(code) = self.device.poll()? {
                return Ok(Some((code, self.timer.elapsed(start))));
            }
            let waited = self.timer.elapsed(start);
            if waited >= timeout {
                return Ok(None);
            }
            self.timer.sleep(self.interval.min(timeout - waited));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ScriptedButtons;
    use hrl_core::{HrlError, ResponsePixxMap};
    use hrl_timing::ManualTimer;
    use std::collections::VecDeque;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn reader(events: &[(u32, u64)]) -> ButtonReader<ScriptedButtons, ResponsePixxMap> {
        let source = ScriptedButtons::new(events.iter().map(|(c, t)| (*c, ms(*t))));
        ButtonReader::new(source, ResponsePixxMap)
    }

    #[test]
    fn any_key_accepted_without_restriction() {
        let mut input = reader(&[(2, 120)]);
        assert_eq!(
            input.read_button(&[], ms(1000)).unwrap(),
            (Some(Key::Up), ms(120))
        );
    }

    #[test]
    fn rejected_presses_add_to_elapsed_time() {
        let mut input = reader(&[(1, 100), (4, 50), (16, 30)]);
        assert_eq!(
            input.read_button(&[Key::Space], ms(1000)).unwrap(),
            (Some(Key::Space), ms(180))
        );
    }

    #[test]
    fn timeout_reports_the_full_budget() {
        let mut input = reader(&[]);
        assert_eq!(input.read_button(&[], ms(500)).unwrap(), (None, ms(500)));

        // the accepted key would arrive after the budget is used up
        let mut input = reader(&[(1, 300), (16, 400)]);
        assert_eq!(
            input.read_button(&[Key::Space], ms(500)).unwrap(),
            (None, ms(500))
        );
    }

    #[test]
    fn unknown_codes_fail_the_read() {
        let mut input = reader(&[(99, 10)]);
        assert!(matches!(
            input.read_button(&[], ms(500)),
            Err(HrlError::UnknownButtonCode(99))
        ));
    }

    #[test]
    fn many_rejections_do_not_grow_the_stack() {
        let mut events: Vec<(u32, u64)> = vec![(1, 0); 100_000];
        events.push((8, 5));
        let mut input = reader(&events);
        assert_eq!(
            input.read_button(&[Key::Down], ms(10)).unwrap(),
            (Some(Key::Down), ms(5))
        );
    }

    struct Script(VecDeque<Option<u32>>);

    impl ButtonPoll for Script {
        fn poll(&mut self) -> HrlResult<Option<u32>> {
            Ok(self.0.pop_front().flatten())
        }
    }

    #[test]
    fn polling_measures_time_to_press() {
        let timer = ManualTimer::new();
        let script = Script(VecDeque::from([None, None, None, Some(8)]));
        let mut source = PollingButtons::new(script, timer, ms(10));
        assert_eq!(source.wait_button(ms(100)).unwrap(), Some((8, ms(30))));
    }

    #[test]
    fn polling_gives_up_at_timeout() {
        let timer = ManualTimer::new();
        let mut source = PollingButtons::new(Script(VecDeque::new()), timer.clone(), ms(30));
        assert_eq!(source.wait_button(ms(100)).unwrap(), None);
        assert_eq!(timer.now(), ms(100).as_nanos() as u64);
    }
}
