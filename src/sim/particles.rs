//! Cosmetic particles
//!
//! Never read back by the simulation; spawning respects the settings cap.

use glam::Vec2;

use super::generator::RandomSource;
use super::state::Particle;

/// Explosion palette (hot core to embers)
const EXPLOSION_COLORS: [u32; 3] = [0xff_44_22, 0xff_aa_00, 0xff_ee_88];
const DUST_COLOR: u32 = 0xcc_cc_dd;

/// Radial burst, used when the player crashes
pub fn spawn_explosion<R: RandomSource + ?Sized>(
    particles: &mut Vec<Particle>,
    center: Vec2,
    count: usize,
    cap: usize,
    rng: &mut R,
) {
    for i in 0..count {
        if particles.len() >= cap {
            break;
        }
        let angle = rng.up_to(std::f32::consts::TAU);
        let speed = rng.between(2.0, 8.0);
        particles.push(Particle {
            pos: center,
            vel: Vec2::new(angle.cos(), angle.sin()) * speed,
            life: 1.0,
            color: EXPLOSION_COLORS[i % EXPLOSION_COLORS.len()],
            radius: rng.between(2.0, 5.0),
        });
    }
}

/// Small puff behind the player's feet on take-off
pub fn spawn_jump_dust<R: RandomSource + ?Sized>(
    particles: &mut Vec<Particle>,
    feet: Vec2,
    count: usize,
    cap: usize,
    rng: &mut R,
) {
    for _ in 0..count {
        if particles.len() >= cap {
            break;
        }
        particles.push(Particle {
            pos: feet,
            vel: Vec2::new(-rng.between(1.0, 3.0), -rng.up_to(2.0)),
            life: 1.0,
            color: DUST_COLOR,
            radius: rng.between(1.5, 3.0),
        });
    }
}

/// Move every particle and drop those whose life has run out
pub fn advance(particles: &mut Vec<Particle>, decay: f32) {
    for particle in particles.iter_mut() {
        particle.pos += particle.vel;
        particle.life -= decay;
    }
    particles.retain(|p| p.life > 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::PARTICLE_DECAY;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn particle(life: f32) -> Particle {
        Particle {
            pos: Vec2::ZERO,
            vel: Vec2::new(1.0, -2.0),
            life,
            color: 0,
            radius: 2.0,
        }
    }

    #[test]
    fn test_explosion_count_and_cap() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut particles = Vec::new();
        spawn_explosion(&mut particles, Vec2::new(10.0, 10.0), 30, 256, &mut rng);
        assert_eq!(particles.len(), 30);
        assert!(particles.iter().all(|p| p.life == 1.0 && p.pos == Vec2::new(10.0, 10.0)));

        let mut capped = Vec::new();
        spawn_explosion(&mut capped, Vec2::ZERO, 30, 12, &mut rng);
        assert_eq!(capped.len(), 12);
    }

    #[test]
    fn test_jump_dust_drifts_back() {
        let mut rng = Pcg32::seed_from_u64(9);
        let mut particles = Vec::new();
        spawn_jump_dust(&mut particles, Vec2::ZERO, 8, 256, &mut rng);
        assert_eq!(particles.len(), 8);
        assert!(particles.iter().all(|p| p.vel.x < 0.0));
    }

    #[test]
    fn test_advance_moves_and_decays() {
        let mut particles = vec![particle(1.0)];
        advance(&mut particles, PARTICLE_DECAY);
        assert_eq!(particles[0].pos, Vec2::new(1.0, -2.0));
        assert!((particles[0].life - 0.98).abs() < 1e-6);
    }

    #[test]
    fn test_removed_on_the_tick_life_reaches_zero() {
        let mut particles = vec![particle(PARTICLE_DECAY), particle(PARTICLE_DECAY * 2.0)];
        advance(&mut particles, PARTICLE_DECAY);
        assert_eq!(particles.len(), 1);
        advance(&mut particles, PARTICLE_DECAY);
        assert!(particles.is_empty());
    }
}
