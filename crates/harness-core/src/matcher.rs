//! Record matcher: las tres semánticas de comparación.
//!
//! - presencia (`expect_entries_to_match`): cada esperado aparece al menos una
//!   vez en el stream; los extras y duplicados no fallan.
//! - conjunto (`expect_entries_in_array_to_match`): el array actual es igual,
//!   como multiconjunto, al esperado.
//! - presencia por intervalos (`expect_entries_in_multiple_array_to_match`):
//!   cada esperado aparece en al menos un intervalo, no necesariamente el
//!   mismo para todos.
//!
//! La igualdad es siempre `PartialEq` tras normalizar los registros actuales.

use rayon::prelude::*;

use crate::decode::{decode_array, decode_arrays, decode_stream};
use crate::errors::{MatchError, ValidationError};
use crate::normalize::{normalize_all, Normalizer};
use crate::record::{render_record, render_records, Record};

/// Presencia sobre un stream de objetos.
pub fn expect_entries_to_match<T, N>(output: &str, normalizer: &N, expected: &[T]) -> Result<(), ValidationError>
    where T: Record,
          N: Normalizer<T> + ?Sized
{
    let mut actual: Vec<T> = decode_stream(output)?;
    normalize_all(&mut actual, normalizer);
    match_presence(&actual, expected)?;
    Ok(())
}

/// Igualdad de multiconjunto sobre un único array.
pub fn expect_entries_in_array_to_match<T, N>(output: &str,
                                             normalizer: &N,
                                             expected: &[T])
                                             -> Result<(), ValidationError>
    where T: Record,
          N: Normalizer<T> + ?Sized
{
    let mut actual: Vec<T> = decode_array(output)?;
    normalize_all(&mut actual, normalizer);
    match_multiset(&actual, expected)?;
    Ok(())
}

/// Presencia a través de varios arrays (uno por intervalo).
pub fn expect_entries_in_multiple_array_to_match<T, N>(output: &str,
                                                      normalizer: &N,
                                                      expected: &[T])
                                                      -> Result<(), ValidationError>
    where T: Record,
          N: Normalizer<T> + ?Sized
{
    let mut intervals: Vec<Vec<T>> = decode_arrays(output)?;
    for interval in intervals.iter_mut() {
        normalize_all(interval, normalizer);
    }
    match_interval_presence(&intervals, expected)?;
    Ok(())
}

/// Cada esperado tiene al menos un actual igual. No consume actuales.
pub fn match_presence<T: Record>(actual: &[T], expected: &[T]) -> Result<(), MatchError> {
    let missing = expected.par_iter().position_first(|e| !actual.contains(e));
    match missing {
        None => Ok(()),
        Some(i) => Err(MatchError::MissingEntry { expected: render_record(&expected[i]),
                                                  actual: render_records(actual) }),
    }
}

/// Igualdad de multiconjunto: misma cardinalidad y mismos elementos.
///
/// Se reporta primero el esperado faltante; si no falta ninguno, los actuales
/// sobrantes. El resultado booleano es simétrico en `actual`/`expected`.
pub fn match_multiset<T: Record>(actual: &[T], expected: &[T]) -> Result<(), MatchError> {
    let mut remaining: Vec<&T> = actual.iter().collect();
    for e in expected {
        match remaining.iter().position(|a| *a == e) {
            Some(pos) => {
                remaining.swap_remove(pos);
            }
            None => {
                return Err(MatchError::MissingEntry { expected: render_record(e),
                                                      actual: render_records(actual) })
            }
        }
    }
    if remaining.is_empty() {
        Ok(())
    } else {
        Err(MatchError::UnexpectedEntries { unexpected: remaining.into_iter().map(render_record).collect(),
                                            actual: render_records(actual) })
    }
}

/// Cada esperado aparece en algún intervalo. Intervalos vacíos no afectan.
pub fn match_interval_presence<T: Record>(intervals: &[Vec<T>], expected: &[T]) -> Result<(), MatchError> {
    let missing = expected.par_iter()
                          .position_first(|e| !intervals.iter().any(|interval| interval.contains(e)));
    match missing {
        None => Ok(()),
        Some(i) => Err(MatchError::NeverObserved { expected: render_record(&expected[i]),
                                                   actual: intervals.iter().map(|iv| render_records(iv)).collect() }),
    }
}
