use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// RNG интерфейс для сдачи карт.
pub trait RandomSource {
    fn shuffle<T>(&mut self, slice: &mut [T]);
}

/// Системный RNG (thread_rng) - для живых сессий.
#[derive(Clone, Debug, Default)]
pub struct SystemRng;

impl RandomSource for SystemRng {
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut rand::thread_rng());
    }
}

/// Детерминированный RNG для тестов и реплея.
/// Позволяет воспроизводить одни и те же раздачи при одинаковом seed.
#[derive(Clone, Debug)]
pub struct DeterministicRng {
    inner: StdRng,
}

impl DeterministicRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for DeterministicRng {
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.inner);
    }
}

/// Источник случайности, который можно хранить в менеджере сессии
/// (нужен `Send`, чтобы менеджер переезжал в blocking-пул симуляции).
#[derive(Clone, Debug)]
pub enum SessionRng {
    System(SystemRng),
    Seeded(DeterministicRng),
}

impl SessionRng {
    pub fn system() -> Self {
        SessionRng::System(SystemRng)
    }

    pub fn seeded(seed: u64) -> Self {
        SessionRng::Seeded(DeterministicRng::from_seed(seed))
    }
}

impl Default for SessionRng {
    fn default() -> Self {
        Self::system()
    }
}

impl RandomSource for SessionRng {
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        match self {
            SessionRng::System(r) => r.shuffle(slice),
            SessionRng::Seeded(r) => r.shuffle(slice),
        }
    }
}
