use tracing::debug;

/// Подавитель дребезга: стабильное значение меняется только после
/// `samples_required_to_flip` подряд идущих противоположных сэмплов.
///
/// Вызывается ровно раз за тик, строго по порядку тиков.
#[derive(Debug, Clone)]
pub struct HysteresisFilter {
    stable_busy: bool,
    consecutive_contrary_count: u32,
    samples_required_to_flip: u32,
}

impl HysteresisFilter {
    pub fn new(samples_required_to_flip: u32) -> Self {
        Self::with_initial(false, samples_required_to_flip)
    }

    pub fn with_initial(stable_busy: bool, samples_required_to_flip: u32) -> Self {
        Self {
            stable_busy,
            consecutive_contrary_count: 0,
            samples_required_to_flip: samples_required_to_flip.max(1),
        }
    }

    pub fn stable_busy(&self) -> bool {
        self.stable_busy
    }

    pub fn consecutive_contrary_count(&self) -> u32 {
        self.consecutive_contrary_count
    }

    pub fn samples_required_to_flip(&self) -> u32 {
        self.samples_required_to_flip
    }

    /// Применить сырой сэмпл тика и вернуть стабильное значение
    pub fn apply(&mut self, raw_busy: bool) -> bool {
        if raw_busy == self.stable_busy {
            // Согласный сэмпл обнуляет прогресс к переключению
            self.consecutive_contrary_count = 0;
            return self.stable_busy;
        }

        self.consecutive_contrary_count += 1;
        if self.consecutive_contrary_count >= self.samples_required_to_flip {
            debug!(
                "Гистерезис: {} -> {} после {} сэмплов",
                self.stable_busy, raw_busy, self.consecutive_contrary_count
            );
            self.stable_busy = raw_busy;
            self.consecutive_contrary_count = 0;
        }

        self.stable_busy
    }
}
